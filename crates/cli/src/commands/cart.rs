//! Cart commands.
//!
//! The cart lives in `<cart-dir>/cartItems.json`. With `SUNDRY_EMAIL` and
//! `SUNDRY_PASSWORD` set, every command first signs in and reconciles with
//! the account's stored cart, and every change is written back remotely.

use std::fmt::Write as _;
use std::path::Path;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

use sundry_core::{Cart, NewCartItem, ProductId, format_price};
use sundry_storefront::cart::{CartManager, FileStorage, StorefrontCart, SupabaseCartStore};
use sundry_storefront::models::CurrentUser;
use sundry_storefront::services::{AuthService, CatalogService};
use sundry_storefront::supabase::SupabaseClient;

use super::{CommandError, supabase_client};

const EMAIL_VAR: &str = "SUNDRY_EMAIL";
const PASSWORD_VAR: &str = "SUNDRY_PASSWORD";

/// Print the cart.
pub async fn show(cart_dir: &Path) -> Result<(), CommandError> {
    let cart = open(&supabase_client()?, cart_dir).await?;
    print(cart.cart());
    Ok(())
}

/// Add one unit of a product.
///
/// `inline` carries a name and price given on the command line; without it
/// the product is looked up in the catalog.
pub async fn add(
    cart_dir: &Path,
    id: ProductId,
    inline: Option<(String, Decimal)>,
    image: Option<String>,
) -> Result<(), CommandError> {
    let client = supabase_client()?;

    let item = match inline {
        Some((name, price)) => NewCartItem {
            id,
            name,
            price,
            image: image.unwrap_or_default(),
        },
        None => {
            let product = CatalogService::new(client.clone())
                .product(id)
                .await?
                .ok_or(CommandError::ProductNotFound(id))?;
            let mut item = product.to_cart_item();
            if let Some(image) = image {
                item.image = image;
            }
            item
        }
    };

    let mut cart = open(&client, cart_dir).await?;
    tracing::info!(product_id = %id, name = %item.name, "Adding to cart");
    cart.add_item(item).await?;
    print(cart.cart());
    Ok(())
}

/// Remove a product's line.
pub async fn remove(cart_dir: &Path, id: ProductId) -> Result<(), CommandError> {
    let mut cart = open(&supabase_client()?, cart_dir).await?;
    if cart.cart().get(id).is_none() {
        tracing::warn!(product_id = %id, "Product is not in the cart");
    }
    cart.remove_item(id).await?;
    print(cart.cart());
    Ok(())
}

/// Set a product's quantity.
pub async fn set(cart_dir: &Path, id: ProductId, quantity: i64) -> Result<(), CommandError> {
    let mut cart = open(&supabase_client()?, cart_dir).await?;
    if cart.cart().get(id).is_none() {
        tracing::warn!(product_id = %id, "Product is not in the cart");
    }
    cart.update_quantity(id, quantity).await?;
    print(cart.cart());
    Ok(())
}

/// Empty the cart.
pub async fn clear(cart_dir: &Path) -> Result<(), CommandError> {
    let mut cart = open(&supabase_client()?, cart_dir).await?;
    cart.clear_cart().await?;
    print(cart.cart());
    Ok(())
}

/// Reconcile with the stored cart and print the result.
///
/// Opening the cart already reconciles when signed in; without credentials
/// there is nothing to sync with.
pub async fn sync(cart_dir: &Path) -> Result<(), CommandError> {
    let cart = open(&supabase_client()?, cart_dir).await?;
    if cart.session().is_none() {
        tracing::warn!("Set {EMAIL_VAR} and {PASSWORD_VAR} to sync with a stored cart");
    }
    print(cart.cart());
    Ok(())
}

/// Build and initialize the manager for `cart_dir`.
async fn open(client: &SupabaseClient, cart_dir: &Path) -> Result<StorefrontCart, CommandError> {
    let user = sign_in_from_env(client).await?;
    let mut cart = CartManager::new(
        FileStorage::new(cart_dir),
        SupabaseCartStore::new(client.clone()),
        user,
    );
    cart.initialize().await?;
    Ok(cart)
}

/// Sign in when credentials are present in the environment.
async fn sign_in_from_env(client: &SupabaseClient) -> Result<Option<CurrentUser>, CommandError> {
    let (Ok(email), Ok(password)) = (std::env::var(EMAIL_VAR), std::env::var(PASSWORD_VAR)) else {
        return Ok(None);
    };
    let password = SecretString::from(password);

    let user = AuthService::new(client)
        .sign_in(&email, password.expose_secret())
        .await?;
    tracing::info!(user_id = %user.id, "Signed in");
    Ok(Some(user))
}

#[allow(clippy::print_stdout)]
fn print(cart: &Cart) {
    print!("{}", render(cart));
}

/// Plain-text cart listing.
fn render(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    for item in cart.items() {
        let _ = writeln!(
            out,
            "{:>6}  {:<32} {:>4} x {:>10} = {:>10}",
            item.id,
            item.name,
            item.quantity,
            format_price(item.price),
            format_price(item.line_total()),
        );
    }
    let _ = writeln!(
        out,
        "{} item(s), total {}",
        cart.item_count(),
        format_price(cart.total_price())
    );
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use sundry_storefront::config::SupabaseConfig;
    use tempfile::TempDir;

    use super::*;

    fn widget() -> NewCartItem {
        NewCartItem {
            id: ProductId::new(7),
            name: "Widget".to_string(),
            price: Decimal::from(10),
            image: String::new(),
        }
    }

    /// A client that is never called: anonymous carts stay local.
    fn offline_client() -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: "http://127.0.0.1:9".to_string(),
            anon_key: SecretString::from("offline"),
        })
        .unwrap()
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&Cart::new()), "Cart is empty\n");
    }

    #[test]
    fn test_render_lists_lines_and_total() {
        let cart = Cart::from_items([widget().with_quantity(2)]);
        let out = render(&cart);

        assert!(out.contains("Widget"));
        assert!(out.contains("$20.00"));
        assert!(out.ends_with("2 item(s), total $20.00\n"));
    }

    #[tokio::test]
    async fn test_anonymous_cart_survives_between_runs() {
        let dir = TempDir::new().unwrap();
        let client = offline_client();

        let mut cart = open(&client, dir.path()).await.unwrap();
        cart.add_item(widget()).await.unwrap();
        cart.add_item(widget()).await.unwrap();
        drop(cart);

        let cart = open(&client, dir.path()).await.unwrap();
        assert_eq!(cart.item_count(), 2);
        assert!(dir.path().join("cartItems.json").exists());
    }
}
