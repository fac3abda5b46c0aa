// bookstore/src/models/user.rs
use super::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Admin,
}

impl Role {
  pub fn is_elevated(&self) -> bool {
    matches!(self, Role::Admin)
  }
}

/// A `users` document. Created at registration with `Role::User`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  #[serde(skip_serializing, default)]
  pub id: UserId,
  pub email: String,
  #[serde(default)]
  pub role: Role,
}
