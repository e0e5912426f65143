//! Catalog commands.

use std::fmt::Write as _;

use sundry_core::{ProductId, format_price};
use sundry_storefront::models::Product;
use sundry_storefront::services::CatalogService;

use super::{CommandError, supabase_client};

/// List all products.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), CommandError> {
    let products = CatalogService::new(supabase_client()?).products().await?;
    tracing::info!(count = products.len(), "Fetched products");

    for product in products.iter() {
        println!(
            "{:>6}  {:<32} {:>10}  {}",
            product.id,
            product.name,
            format_price(product.price),
            stock_label(product)
        );
    }
    Ok(())
}

/// Show one product.
#[allow(clippy::print_stdout)]
pub async fn show(id: ProductId) -> Result<(), CommandError> {
    let product = CatalogService::new(supabase_client()?)
        .product(id)
        .await?
        .ok_or(CommandError::ProductNotFound(id))?;

    print!("{}", describe(&product));
    Ok(())
}

fn stock_label(product: &Product) -> String {
    if product.in_stock() {
        format!("{} in stock", product.stock_quantity)
    } else {
        "out of stock".to_string()
    }
}

fn describe(product: &Product) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{} {}", product.id, product.name);
    let _ = writeln!(out, "Price: {}", format_price(product.price));
    let _ = writeln!(out, "Stock: {}", stock_label(product));
    if let Some(image) = &product.image_url {
        let _ = writeln!(out, "Image: {image}");
    }
    if let Some(description) = &product.description {
        let _ = writeln!(out, "\n{description}");
    }
    out
}
