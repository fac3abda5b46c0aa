// bookstore/src/models/mod.rs

//! Documents stored in the `users`, `books`, `carts` and `orders` collections, plus the
//! session value threaded through every operation.
//!
//! Document ids are not part of the stored body: they are skipped on write and filled
//! back in from the document key on read (see `StoredDocument::decode`).

pub mod book;
pub mod cart;
pub mod ids;
pub mod order;
pub mod session;
pub mod user;

pub use book::Book;
pub use cart::{Cart, CartItem};
pub use ids::{BookId, OrderId, UserId};
pub use order::{Order, OrderLine, OrderStatus};
pub use session::{Actor, Session};
pub use user::{Role, User};
