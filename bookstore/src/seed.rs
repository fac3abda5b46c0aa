// bookstore/src/seed.rs

//! Demo data: a handful of books plus one administrator and one regular account.

use crate::errors::Result;
use crate::models::{Book, BookId, Role, Session};
use crate::state::AppState;
use rust_decimal::Decimal;
use tracing::info;

pub const DEMO_ADMIN_EMAIL: &str = "admin@bookstore.test";
pub const DEMO_USER_EMAIL: &str = "reader@bookstore.test";
pub const DEMO_PASSWORD: &str = "correct-horse";

pub struct SeededData {
  pub books: Vec<Book>,
  pub admin: Session,
  pub user: Session,
}

fn demo_book(title: &str, author: &str, quantity: i64, price_cents: i64) -> Book {
  Book {
    id: BookId::default(),
    title: title.to_string(),
    author: author.to_string(),
    quantity,
    price: Decimal::new(price_cents, 2),
    cover: String::new(),
    description: String::new(),
  }
}

pub async fn seed_demo_data(app_state: &AppState) -> Result<SeededData> {
  let mut books = Vec::new();
  for book in [
    demo_book("The Left Hand of Darkness", "Ursula K. Le Guin", 12, 1499),
    demo_book("Piranesi", "Susanna Clarke", 5, 1800),
    demo_book("The Dispossessed", "Ursula K. Le Guin", 3, 1350),
  ] {
    books.push(app_state.catalog.add_book(book).await?);
  }

  let admin = app_state.auth.register(DEMO_ADMIN_EMAIL, DEMO_PASSWORD).await?;
  if let Some(actor) = admin.actor() {
    app_state.auth.set_role(&actor.user_id, Role::Admin).await?;
  }
  // Sign in again so the session carries the elevated role.
  let admin = app_state.auth.sign_in(DEMO_ADMIN_EMAIL, DEMO_PASSWORD).await?;
  let user = app_state.auth.register(DEMO_USER_EMAIL, DEMO_PASSWORD).await?;

  info!(books = books.len(), "Demo data seeded.");
  Ok(SeededData { books, admin, user })
}
