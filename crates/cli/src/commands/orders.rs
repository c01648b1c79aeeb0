//! Order history and inventory alert commands.

use shopfront_storefront::api::Product;
use shopfront_storefront::scope::FlowScope;
use shopfront_storefront::session::FileSessionStore;
use shopfront_storefront::state::Storefront;

use super::CliError;

/// Print the signed-in user's orders.
#[allow(clippy::print_stdout)]
pub async fn history(
    storefront: &mut Storefront<FileSessionStore>,
    scope: &FlowScope,
) -> Result<(), CliError> {
    let orders = storefront.order_history(scope).await?;
    if orders.is_empty() {
        println!("No orders yet");
        return Ok(());
    }

    for order in &orders {
        let placed = order
            .created_at
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        println!(
            "{}  {:<10} {:>12}  {placed}",
            order.order_number,
            order.status.to_string(),
            order.total_amount.to_string()
        );
        for item in &order.items {
            println!(
                "      {} x {} @ {}",
                item.quantity, item.product_name, item.unit_price
            );
        }
    }
    Ok(())
}

/// Print low and out of stock products.
#[allow(clippy::print_stdout)]
pub async fn inventory(
    storefront: &mut Storefront<FileSessionStore>,
    scope: &FlowScope,
) -> Result<(), CliError> {
    let report = storefront.inventory_report(scope).await?;
    if report.is_clear() {
        println!("Stock levels are fine");
        return Ok(());
    }

    println!("Low stock ({}):", report.low_stock_count());
    print_products(&report.low_stock);
    println!("Out of stock ({}):", report.out_of_stock_count());
    print_products(&report.out_of_stock);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[Product]) {
    for product in products {
        println!("  {:>5}  {:<40} {}", product.id.as_i64(), product.name, product.stock);
    }
}
