//! Catalog browsing commands.

use shopfront_storefront::catalog::ListingQuery;
use shopfront_storefront::scope::FlowScope;
use shopfront_storefront::session::FileSessionStore;
use shopfront_storefront::state::Storefront;

use super::CliError;

/// Print the products matching `query`.
#[allow(clippy::print_stdout)]
pub async fn products(
    storefront: &mut Storefront<FileSessionStore>,
    query: &ListingQuery,
    scope: &FlowScope,
) -> Result<(), CliError> {
    let listing = storefront.load_listing(scope).await?;
    let products = listing.view(query);

    if products.is_empty() {
        println!("No products found");
        return Ok(());
    }

    for product in products {
        let stock = if product.stock > 0 {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        };
        println!(
            "{:>5}  {:<40} {:>12}  {:<14} {}",
            product.id.as_i64(),
            product.name,
            product.price.to_string(),
            product.category.as_deref().unwrap_or("-"),
            stock
        );
    }
    Ok(())
}

/// Print the category filter values.
#[allow(clippy::print_stdout)]
pub async fn categories(
    storefront: &mut Storefront<FileSessionStore>,
    scope: &FlowScope,
) -> Result<(), CliError> {
    let listing = storefront.load_listing(scope).await?;
    for category in listing.categories() {
        println!("{category}");
    }
    Ok(())
}
