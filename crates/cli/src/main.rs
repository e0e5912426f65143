//! Sundry CLI - Cart and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart kept in ./.sundry
//! sundry cart show
//!
//! # Add a product (looked up in the catalog) or one described inline
//! sundry cart add 7
//! sundry cart add 7 --name Widget --price 10.00
//!
//! # Change or drop a line
//! sundry cart set 7 3
//! sundry cart remove 7
//!
//! # Browse the catalog
//! sundry products list
//! sundry products show 7
//! ```
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL`, `SUPABASE_ANON_KEY` - Supabase project (required)
//! - `SUNDRY_EMAIL`, `SUNDRY_PASSWORD` - Sign in so the cart syncs remotely

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use sundry_core::ProductId;

mod commands;

#[derive(Parser)]
#[command(name = "sundry")]
#[command(author, version, about = "Sundry CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage a local cart (synced remotely when signed in)
    Cart {
        /// Directory holding the cart file
        #[arg(long, global = true, default_value = ".sundry")]
        cart_dir: PathBuf,

        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add one unit of a product
    Add {
        /// Product ID
        id: ProductId,

        /// Product name (skips the catalog lookup together with --price)
        #[arg(long, requires = "price")]
        name: Option<String>,

        /// Unit price
        #[arg(long, requires = "name")]
        price: Option<Decimal>,

        /// Image URL
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a product's line
    Remove {
        /// Product ID
        id: ProductId,
    },
    /// Set a product's quantity (0 or less removes it)
    Set {
        /// Product ID
        id: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
    /// Merge with the cart stored for the signed-in account
    Sync,
}

#[derive(Subcommand)]
enum ProductAction {
    /// List all products
    List,
    /// Show one product
    Show {
        /// Product ID
        id: ProductId,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sundry_cli=info,sundry_storefront=warn".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Cart { cart_dir, action } => match action {
            CartAction::Show => commands::cart::show(&cart_dir).await?,
            CartAction::Add {
                id,
                name,
                price,
                image,
            } => {
                let inline = name.zip(price);
                commands::cart::add(&cart_dir, id, inline, image).await?;
            }
            CartAction::Remove { id } => commands::cart::remove(&cart_dir, id).await?,
            CartAction::Set { id, quantity } => {
                commands::cart::set(&cart_dir, id, quantity).await?;
            }
            CartAction::Clear => commands::cart::clear(&cart_dir).await?,
            CartAction::Sync => commands::cart::sync(&cart_dir).await?,
        },
        Commands::Products { action } => match action {
            ProductAction::List => commands::products::list().await?,
            ProductAction::Show { id } => commands::products::show(id).await?,
        },
    }
    Ok(())
}
