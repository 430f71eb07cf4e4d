//! The cart store.
//!
//! A [`CartStore`] runs as one tokio task that exclusively owns the [`Cart`].
//! Callers hold a cloneable [`CartHandle`] and send it commands over a bounded
//! channel. Commands are applied one at a time in arrival order, so rapid
//! successive calls from anywhere always build on the latest state.
//!
//! Lifecycle of the task:
//! 1. Load the persisted record (missing or unreadable records give an empty cart)
//! 2. Apply commands: mutate, publish the new snapshot, hand it to the writer, reply
//! 3. On shutdown, drain queued commands, wait for the writer to flush, and stop
//!
//! Commands sent while the load is still running wait in the channel, so the
//! loaded record never overwrites a mutation.
//!
//! Writes run on a separate writer task fed through a `watch` channel. A slow
//! or hung backend never holds up the next command; the writer always
//! overwrites the record with the newest revision it has seen.

use std::sync::Arc;

use marketplace_core::ProductId;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::cart::{Cart, DecrementOutcome, NewLineItem};
use crate::config::CartConfig;
use crate::error::{CartError, Result};
use crate::snapshot;
use crate::storage::KeyValueStore;

/// Read-only view of the cart published after every change.
#[derive(Debug, Clone, Default)]
pub struct CartSnapshot {
    /// The cart contents.
    pub cart: Arc<Cart>,
    /// Bumped when the startup load finishes and on every applied mutation.
    pub revision: u64,
    /// Whether the startup load has finished.
    pub loaded: bool,
}

#[derive(Debug)]
enum Command {
    Add {
        item: NewLineItem,
        reply: oneshot::Sender<()>,
    },
    Increment {
        id: ProductId,
        reply: oneshot::Sender<()>,
    },
    Decrement {
        id: ProductId,
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Owner of the cart state and its persisted record.
pub struct CartStore<S> {
    storage: S,
    storage_key: String,
    command_buffer: usize,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Create a store persisting through `storage`.
    #[must_use]
    pub fn new(storage: S, config: &CartConfig) -> Self {
        Self {
            storage,
            storage_key: config.storage_key.clone(),
            command_buffer: config.command_buffer.max(1),
        }
    }

    /// Start the store task and return a handle to it.
    ///
    /// The persisted record is loaded in the background; use
    /// [`CartHandle::loaded`] to wait for it.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self) -> CartHandle {
        let (commands, receiver) = mpsc::channel(self.command_buffer);
        let (state, state_rx) = watch::channel(CartSnapshot::default());

        let worker = Worker {
            storage: Arc::new(self.storage),
            key: self.storage_key,
            cart: Arc::default(),
            revision: 0,
            loaded: false,
            state,
        };
        tokio::spawn(worker.run(receiver));

        CartHandle {
            commands,
            state: state_rx,
        }
    }
}

struct Worker<S> {
    storage: Arc<S>,
    key: String,
    cart: Arc<Cart>,
    revision: u64,
    loaded: bool,
    state: watch::Sender<CartSnapshot>,
}

impl<S: KeyValueStore> Worker<S> {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let (persist, pending) = watch::channel((0, Arc::clone(&self.cart)));
        let writer = tokio::spawn(write_latest(
            Arc::clone(&self.storage),
            self.key.clone(),
            pending,
        ));

        self.load(&persist).await;

        let mut shutdown_replies = Vec::new();
        while let Some(command) = commands.recv().await {
            match command {
                Command::Add { item, reply } => {
                    let id = item.id.clone();
                    let outcome = Arc::make_mut(&mut self.cart).add(item);
                    debug!(product_id = %id, ?outcome, "Added to cart");
                    self.finish(true, reply, &persist);
                }
                Command::Increment { id, reply } => {
                    let changed = Arc::make_mut(&mut self.cart).increment(&id);
                    debug!(product_id = %id, changed, "Increment");
                    self.finish(changed, reply, &persist);
                }
                Command::Decrement { id, reply } => {
                    let outcome = Arc::make_mut(&mut self.cart).decrement(&id);
                    debug!(product_id = %id, ?outcome, "Decrement");
                    self.finish(outcome != DecrementOutcome::NotFound, reply, &persist);
                }
                Command::Shutdown { reply } => {
                    debug!("Shutdown requested, draining queued commands");
                    commands.close();
                    shutdown_replies.push(reply);
                }
            }
        }

        // Closing the channel lets the writer flush the last revision and exit.
        drop(persist);
        if let Err(e) = writer.await {
            error!(error = %e, "Cart writer task failed");
        }

        for reply in shutdown_replies {
            let _ = reply.send(());
        }
        info!(revision = self.revision, items = self.cart.len(), "Cart store stopped");
    }

    #[instrument(skip(self, persist), fields(key = %self.key))]
    async fn load(&mut self, persist: &watch::Sender<(u64, Arc<Cart>)>) {
        let mut normalized = false;
        let cart = match snapshot::read_snapshot(&*self.storage, &self.key).await {
            Ok(Some(stored)) => {
                let (cart, discarded) = Cart::from_stored(stored);
                if discarded > 0 {
                    warn!(discarded, "Dropped invalid entries from persisted cart");
                    normalized = true;
                }
                info!(items = cart.len(), "Loaded persisted cart");
                cart
            }
            Ok(None) => {
                debug!("No persisted cart, starting empty");
                Cart::default()
            }
            Err(e) => {
                warn!(error = %e, "Persisted cart unreadable, starting empty");
                Cart::default()
            }
        };

        self.cart = Arc::new(cart);
        self.loaded = true;
        self.revision += 1;
        self.publish();

        if normalized {
            self.persist(persist);
        }
    }

    /// Publish a change and queue it for writing, then reply to the caller.
    fn finish(
        &mut self,
        changed: bool,
        reply: oneshot::Sender<()>,
        persist: &watch::Sender<(u64, Arc<Cart>)>,
    ) {
        if changed {
            self.revision += 1;
            self.publish();
            self.persist(persist);
        }

        // The caller may have stopped waiting; the mutation stands regardless.
        let _ = reply.send(());
    }

    fn publish(&self) {
        self.state.send_replace(CartSnapshot {
            cart: Arc::clone(&self.cart),
            revision: self.revision,
            loaded: self.loaded,
        });
    }

    fn persist(&self, persist: &watch::Sender<(u64, Arc<Cart>)>) {
        persist.send_replace((self.revision, Arc::clone(&self.cart)));
    }
}

/// Overwrite the stored record with each new revision until the worker is done.
///
/// Revisions queued while a write is in flight collapse into the newest one.
/// Once the sender is dropped, any revision not yet written is still flushed.
async fn write_latest<S: KeyValueStore>(
    storage: Arc<S>,
    key: String,
    mut pending: watch::Receiver<(u64, Arc<Cart>)>,
) {
    while pending.changed().await.is_ok() {
        let (revision, cart) = pending.borrow_and_update().clone();
        if let Err(e) = snapshot::write_snapshot(&*storage, &key, &cart).await {
            error!(
                error = %e,
                key = %key,
                revision,
                "Failed to persist cart, in-memory state kept"
            );
        }
    }
    debug!(key = %key, "Cart writer stopped");
}

/// Handle to a running [`CartStore`].
///
/// Cheap to clone. Every method fails with [`CartError::Uninitialized`] once
/// the store has shut down.
#[derive(Debug, Clone)]
pub struct CartHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<CartSnapshot>,
}

impl CartHandle {
    /// Current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Uninitialized`] if the store is not running.
    pub fn snapshot(&self) -> Result<CartSnapshot> {
        self.ensure_active()?;
        Ok(self.state.borrow().clone())
    }

    /// Current cart contents.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Uninitialized`] if the store is not running.
    pub fn cart(&self) -> Result<Arc<Cart>> {
        self.snapshot().map(|snapshot| snapshot.cart)
    }

    /// Receiver notified after the load and after every applied mutation.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Uninitialized`] if the store is not running.
    pub fn subscribe(&self) -> Result<watch::Receiver<CartSnapshot>> {
        self.ensure_active()?;
        Ok(self.state.clone())
    }

    /// Wait until the persisted cart has been loaded.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Uninitialized`] if the store is not running or
    /// stops before loading.
    pub async fn loaded(&self) -> Result<()> {
        self.ensure_active()?;
        let mut state = self.state.clone();
        if state.wait_for(|snapshot| snapshot.loaded).await.is_err() {
            return Err(CartError::Uninitialized);
        }
        Ok(())
    }

    /// Add a product, or one more unit of it if it is already in the cart.
    ///
    /// Returns once the change is visible in [`snapshot`](Self::snapshot).
    /// Persisting happens afterwards and its failures are only logged.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Uninitialized`] if the store is not running.
    #[instrument(skip(self, item), fields(product_id = %item.id))]
    pub async fn add_to_cart(&self, item: NewLineItem) -> Result<()> {
        self.request(|reply| Command::Add { item, reply }).await
    }

    /// Add one unit of `id`. Unknown IDs leave the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Uninitialized`] if the store is not running.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn increment(&self, id: ProductId) -> Result<()> {
        self.request(|reply| Command::Increment { id, reply }).await
    }

    /// Remove one unit of `id`, dropping the item when none are left.
    /// Unknown IDs leave the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Uninitialized`] if the store is not running.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn decrement(&self, id: ProductId) -> Result<()> {
        self.request(|reply| Command::Decrement { id, reply }).await
    }

    /// Stop the store after applying and persisting everything already queued.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Uninitialized`] if the store is already stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    fn ensure_active(&self) -> Result<()> {
        if self.commands.is_closed() {
            return Err(CartError::Uninitialized);
        }
        Ok(())
    }

    async fn request(&self, command: impl FnOnce(oneshot::Sender<()>) -> Command) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| CartError::Uninitialized)?;
        done.await.map_err(|_| CartError::Uninitialized)
    }
}
