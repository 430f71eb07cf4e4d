//! Marketplace CLI - inspect and edit the locally persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! mp-cli cart show
//!
//! # Show the cart as the JSON record it is stored as
//! mp-cli cart show --json
//!
//! # Add a product (or one more unit of it)
//! mp-cli cart add --id 1 --title "Shoe" --image-url https://cdn.example.com/1.png --price 10
//!
//! # Change quantities
//! mp-cli cart increment 1
//! mp-cli cart decrement 1
//! ```
//!
//! # Environment Variables
//!
//! - `MP_CART_STORAGE_DIR`, `MP_CART_STORAGE_KEY`, `MP_CART_COMMAND_BUFFER` - see `CartConfig`
//! - `MP_LOG_JSON` - Emit logs as JSON lines
//! - `RUST_LOG` - Log filter (default: `marketplace_cart=info,mp_cli=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use marketplace_core::{Price, ProductId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "mp-cli")]
#[command(author, version, about = "GoMarketplace cart tools")]
struct Cli {
    /// Directory holding the persisted cart (overrides `MP_CART_STORAGE_DIR`)
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show {
        /// Print the stored JSON record instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Add a product, or one more unit if it is already in the cart
    Add {
        /// Product ID
        #[arg(long)]
        id: ProductId,

        /// Product title
        #[arg(long)]
        title: String,

        /// Product image URL
        #[arg(long)]
        image_url: String,

        /// Unit price (e.g. 19.90)
        #[arg(long)]
        price: Price,
    },
    /// Add one unit of a product already in the cart
    Increment {
        /// Product ID
        id: ProductId,
    },
    /// Remove one unit of a product, dropping it at zero
    Decrement {
        /// Product ID
        id: ProductId,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketplace_cart=info,mp_cli=info".into());

    // Logs go to stderr so stdout stays clean for the cart output.
    let json = std::env::var("MP_LOG_JSON").is_ok();
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let session = commands::cart::Session::open(cli.storage_dir).await?;

    let outcome = match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show { json } => session.show(json),
            CartAction::Add {
                id,
                title,
                image_url,
                price,
            } => {
                session
                    .add(marketplace_cart::NewLineItem {
                        id,
                        title,
                        image_url,
                        price,
                    })
                    .await
            }
            CartAction::Increment { id } => session.increment(id).await,
            CartAction::Decrement { id } => session.decrement(id).await,
        },
    };

    // Flush pending writes even when the command itself failed.
    let closed = session.close().await;
    commands::cart::settle(outcome, closed)?;
    Ok(())
}
