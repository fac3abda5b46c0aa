// bookstore/src/models/session.rs
use super::{Role, UserId};

/// The signed-in user, resolved once at sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
  pub user_id: UserId,
  pub email: String,
  pub role: Role,
}

/// Explicit session value passed into every operation that needs to know who is acting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
  actor: Option<Actor>,
}

impl Session {
  pub fn anonymous() -> Self {
    Self { actor: None }
  }

  pub fn signed_in(actor: Actor) -> Self {
    Self { actor: Some(actor) }
  }

  pub fn actor(&self) -> Option<&Actor> {
    self.actor.as_ref()
  }

  pub fn user_id(&self) -> Option<&UserId> {
    self.actor.as_ref().map(|a| &a.user_id)
  }

  pub fn is_elevated(&self) -> bool {
    self.actor.as_ref().is_some_and(|a| a.role.is_elevated())
  }
}
