// bookstore/src/models/ids.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! document_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(String);

    impl $name {
      pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
      }

      pub fn as_str(&self) -> &str {
        &self.0
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl From<&str> for $name {
      fn from(id: &str) -> Self {
        Self::new(id)
      }
    }
  };
}

document_id!(
  /// Key of a `users` document; also the key of that user's cart.
  UserId
);
document_id!(BookId);
document_id!(
  /// Key of an `orders` document. Generated before the write and reused on every retry.
  OrderId
);

impl OrderId {
  pub fn generate() -> Self {
    Self(Uuid::new_v4().to_string())
  }
}
