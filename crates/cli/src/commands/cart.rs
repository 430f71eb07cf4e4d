//! Cart commands.
//!
//! Every invocation opens the persisted cart, applies at most one change,
//! prints the result, and shuts the store down so the write is flushed before
//! the process exits.

use std::io::{self, Write};
use std::path::PathBuf;

use marketplace_cart::{
    Cart, CartConfig, CartError, CartHandle, CartStore, ConfigError, FileStore, NewLineItem,
};
use marketplace_core::ProductId;
use thiserror::Error;

/// Errors that can occur while running a cart command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The cart store rejected the request.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Writing output failed.
    #[error("Output error: {0}")]
    Io(#[from] io::Error),

    /// The cart could not be rendered as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An open cart for the duration of one command.
pub struct Session {
    cart: CartHandle,
}

impl Session {
    /// Load configuration, start the store and wait for the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the store stops early.
    pub async fn open(storage_dir: Option<PathBuf>) -> Result<Self, CommandError> {
        let mut config = CartConfig::from_env()?;
        if let Some(dir) = storage_dir {
            config.storage_dir = dir;
        }

        tracing::debug!(
            dir = %config.storage_dir.display(),
            key = %config.storage_key,
            "Opening cart"
        );
        let cart = CartStore::new(FileStore::new(&config.storage_dir), &config).spawn();
        cart.loaded().await?;

        Ok(Self { cart })
    }

    /// Print the cart as a table, or as its stored JSON record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is gone or output fails.
    pub fn show(&self, json: bool) -> Result<(), CommandError> {
        let cart = self.cart.cart()?;
        let mut out = io::stdout().lock();
        if json {
            serde_json::to_writer_pretty(&mut out, &*cart)?;
            writeln!(out)?;
        } else {
            render_table(&cart, &mut out)?;
        }
        Ok(())
    }

    /// Add a product and print the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is gone or output fails.
    pub async fn add(&self, item: NewLineItem) -> Result<(), CommandError> {
        tracing::info!(product_id = %item.id, "Adding to cart");
        self.cart.add_to_cart(item).await?;
        self.show(false)
    }

    /// Increment a product and print the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is gone or output fails.
    pub async fn increment(&self, id: ProductId) -> Result<(), CommandError> {
        self.warn_if_missing(&id)?;
        self.cart.increment(id).await?;
        self.show(false)
    }

    /// Decrement a product and print the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is gone or output fails.
    pub async fn decrement(&self, id: ProductId) -> Result<(), CommandError> {
        self.warn_if_missing(&id)?;
        self.cart.decrement(id).await?;
        self.show(false)
    }

    /// Stop the store, flushing the last write.
    ///
    /// # Errors
    ///
    /// Returns an error if the store had already stopped.
    pub async fn close(self) -> Result<(), CommandError> {
        self.cart.shutdown().await?;
        Ok(())
    }

    fn warn_if_missing(&self, id: &ProductId) -> Result<(), CommandError> {
        if self.cart.cart()?.get(id).is_none() {
            tracing::warn!(product_id = %id, "Product is not in the cart, nothing to change");
        }
        Ok(())
    }
}

/// Combine a command's result with the result of closing its session.
///
/// The command's own error wins; a close failure alongside it is only logged.
///
/// # Errors
///
/// Returns the command error if there is one, otherwise the close error.
pub fn settle(
    outcome: Result<(), CommandError>,
    closed: Result<(), CommandError>,
) -> Result<(), CommandError> {
    match (outcome, closed) {
        (Err(e), Err(close)) => {
            tracing::warn!(error = %close, "Cart store did not shut down cleanly");
            Err(e)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}

/// Write a human-readable table of `cart`.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render_table(cart: &Cart, out: &mut impl Write) -> io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Cart is empty");
    }

    writeln!(
        out,
        "{:<12} {:<28} {:>5} {:>10} {:>10}",
        "ID", "TITLE", "QTY", "PRICE", "TOTAL"
    )?;
    for item in cart {
        writeln!(
            out,
            "{:<12} {:<28} {:>5} {:>10} {:>10}",
            item.id.as_str(),
            truncate(&item.title, 28),
            item.quantity.get(),
            item.price.amount().round_dp(2).to_string(),
            item.line_total().round_dp(2).to_string()
        )?;
    }
    writeln!(
        out,
        "{} item(s), subtotal {}",
        cart.total_quantity(),
        cart.subtotal().round_dp(2)
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let mut short: String = s.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use marketplace_core::Price;

    use super::*;

    fn cart_with(items: &[(&str, &str, u32, u32)]) -> Cart {
        let mut cart = Cart::default();
        for (id, title, cents, quantity) in items {
            for _ in 0..*quantity {
                cart.add(NewLineItem {
                    id: ProductId::new(*id),
                    title: (*title).to_owned(),
                    image_url: "u".to_owned(),
                    price: Price::from_cents(*cents),
                });
            }
        }
        cart
    }

    fn item(id: &str, cents: u32) -> NewLineItem {
        NewLineItem {
            id: ProductId::new(id),
            title: "Shoe".to_owned(),
            image_url: "u".to_owned(),
            price: Price::from_cents(cents),
        }
    }

    fn render(cart: &Cart) -> String {
        let mut out = Vec::new();
        render_table(cart, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&Cart::default()), "Cart is empty\n");
    }

    #[test]
    fn test_render_rows_and_summary() {
        let output = render(&cart_with(&[("a", "Shoe", 1000, 2), ("b", "Cap", 450, 1)]));
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].starts_with("a "));
        assert!(lines[1].contains("Shoe"));
        assert!(lines[1].trim_end().ends_with("20.00"));
        assert!(lines[2].starts_with("b "));
        assert_eq!(lines[3], "3 item(s), subtotal 24.50");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long product title", 6), "a ver…");
    }

    #[tokio::test]
    async fn test_session_changes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let session = Session::open(Some(dir.path().to_path_buf())).await.unwrap();
        session.add(item("a", 1000)).await.unwrap();
        session.add(item("a", 1000)).await.unwrap();
        session.add(item("b", 450)).await.unwrap();
        session.decrement(ProductId::new("a")).await.unwrap();
        session.increment(ProductId::new("b")).await.unwrap();
        session.close().await.unwrap();

        let reopened = Session::open(Some(dir.path().to_path_buf())).await.unwrap();
        let cart = reopened.cart.cart().unwrap();
        let stored: Vec<(&str, u32)> = cart
            .iter()
            .map(|item| (item.id.as_str(), item.quantity.get()))
            .collect();
        assert_eq!(stored, vec![("a", 1), ("b", 2)]);
        assert_eq!(cart.subtotal().round_dp(2).to_string(), "19.00");
        reopened.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_session_rejects_commands() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(Some(dir.path().to_path_buf())).await.unwrap();
        let handle = session.cart.clone();
        session.close().await.unwrap();

        assert!(matches!(
            handle.add_to_cart(item("a", 1000)).await,
            Err(CartError::Uninitialized)
        ));
    }

    #[test]
    fn test_settle_keeps_command_error() {
        let result = settle(
            Err(CommandError::Cart(CartError::Uninitialized)),
            Err(CommandError::Io(io::Error::other("flush failed"))),
        );
        assert!(matches!(result, Err(CommandError::Cart(CartError::Uninitialized))));
    }

    #[test]
    fn test_settle_reports_close_error() {
        let result = settle(Ok(()), Err(CommandError::Io(io::Error::other("flush failed"))));
        assert!(matches!(result, Err(CommandError::Io(_))));
        assert!(settle(Ok(()), Ok(())).is_ok());
    }
}
