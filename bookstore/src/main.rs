// bookstore/src/main.rs

use anyhow::Context;
use bookstore::{add_to_cart, checkout, seed, telemetry, view_cart, AppConfig, AppState, CheckoutRequest, ShippingDetails};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config = AppConfig::from_env().context("loading configuration")?;
  telemetry::init_tracing(&config);
  tracing::info!("Starting bookstore demo...");

  let seed_catalog = config.seed_catalog;
  let app_state = AppState::in_memory(config);
  if !seed_catalog {
    tracing::info!("Catalog seeding disabled; nothing to demonstrate.");
    return Ok(());
  }

  let seeded = seed::seed_demo_data(&app_state).await.context("seeding demo data")?;
  let books = &seeded.books;

  for session in [&seeded.user, &seeded.admin] {
    add_to_cart(&app_state, session, &books[0].id, 2).await?;
    add_to_cart(&app_state, session, &books[1].id, 1).await?;

    let summary = view_cart(&app_state, session).await?;
    tracing::info!(total = %summary.total(), items = summary.item_count(), "Cart ready.");

    let request = CheckoutRequest::new(ShippingDetails::new("Ada Reader", "555-0100", "1 Library Lane"))
      .with_summary(summary);
    let receipt = checkout(&app_state, session, request).await?;
    tracing::info!(
      order_id = %receipt.order.id,
      total = %receipt.order.total,
      stock_adjusted = receipt.stock_adjusted,
      elevated = session.is_elevated(),
      "Order placed."
    );
  }

  for book in app_state.catalog.list_books().await? {
    tracing::info!(title = %book.title, stock = book.quantity, "Stock after demo.");
  }
  Ok(())
}
