// bookstore/src/services/auth_service.rs

//! Registration, sign-in and sign-out.
//!
//! Identities (email + password) live with an [`AuthProvider`]; roles live in the
//! `users` collection. Sign-in reads the role once and hands back a [`Session`] that the
//! caller threads through every later operation.

use crate::errors::{AppError, Result};
use crate::models::{Actor, Role, Session, User, UserId};
use crate::store::{get_as, Collection, DocumentStore, DocumentWrite, RetryPolicy};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Identity provider: owns credentials, knows nothing about roles.
#[async_trait]
pub trait AuthProvider: Send + Sync {
  /// Creates an identity and returns its user id.
  async fn create_identity(&self, email: &str, password: &str) -> Result<UserId>;

  /// Checks credentials and returns the user id they belong to.
  async fn verify_credentials(&self, email: &str, password: &str) -> Result<UserId>;
}

/// Hashes a plain-text password using Argon2 with a fresh random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// Verifies a plain-text password against a stored Argon2 hash.
///
/// A mismatch is `Ok(false)`; a malformed stored hash is an internal error.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password: &str, provided_password: &str) -> Result<bool> {
  let parsed_hash = PasswordHash::new(hashed_password).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

struct Credential {
  user_id: UserId,
  password_hash: String,
}

/// In-process identity provider with argon2-hashed passwords, keyed by normalized email.
#[derive(Default)]
pub struct LocalAuthProvider {
  credentials: RwLock<HashMap<String, Credential>>,
}

impl LocalAuthProvider {
  pub fn new() -> Self {
    Self::default()
  }
}

fn normalize_email(email: &str) -> String {
  email.trim().to_ascii_lowercase()
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
  async fn create_identity(&self, email: &str, password: &str) -> Result<UserId> {
    let email = normalize_email(email);
    if !email.contains('@') {
      return Err(AppError::Validation("Please enter a valid email address.".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
      return Err(AppError::Validation(format!(
        "Password must be at least {} characters.",
        MIN_PASSWORD_LEN
      )));
    }

    let password_hash = hash_password(password)?;
    let mut credentials = self.credentials.write();
    if credentials.contains_key(&email) {
      return Err(AppError::Auth("This email is already registered.".to_string()));
    }
    let user_id = UserId::new(Uuid::new_v4().to_string());
    credentials.insert(
      email,
      Credential {
        user_id: user_id.clone(),
        password_hash,
      },
    );
    Ok(user_id)
  }

  async fn verify_credentials(&self, email: &str, password: &str) -> Result<UserId> {
    let invalid = || AppError::Auth("Invalid email or password. Please try again.".to_string());

    let (user_id, password_hash) = {
      let credentials = self.credentials.read();
      let credential = credentials.get(&normalize_email(email)).ok_or_else(invalid)?;
      (credential.user_id.clone(), credential.password_hash.clone())
    };

    if verify_password(&password_hash, password)? {
      Ok(user_id)
    } else {
      Err(invalid())
    }
  }
}

/// Ties the identity provider to the `users` collection.
#[derive(Clone)]
pub struct Authenticator {
  provider: Arc<dyn AuthProvider>,
  store: Arc<dyn DocumentStore>,
  retry: RetryPolicy,
}

impl Authenticator {
  pub fn new(provider: Arc<dyn AuthProvider>, store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> Self {
    Self { provider, store, retry }
  }

  /// Creates the identity and a `users` document with `Role::User`, then signs in.
  #[instrument(name = "Authenticator::register", skip(self, password), err(Display))]
  pub async fn register(&self, email: &str, password: &str) -> Result<Session> {
    let user_id = self.provider.create_identity(email, password).await?;
    let user = User {
      id: user_id.clone(),
      email: normalize_email(email),
      role: Role::User,
    };
    let write = DocumentWrite::from_value(&user)?;

    self
      .retry
      .run("create user", |_| self.store.create(Collection::Users, Some(user_id.as_str()), write.clone()))
      .await
      .map_err(|e| AppError::from_store("create user", e))?;

    info!(%user_id, "User registered.");
    Ok(Session::signed_in(Actor {
      user_id,
      email: user.email,
      role: Role::User,
    }))
  }

  /// Verifies credentials and resolves the role. A missing `users` document means
  /// `Role::User`.
  #[instrument(name = "Authenticator::sign_in", skip(self, password), err(Display))]
  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
    let user_id = self.provider.verify_credentials(email, password).await?;

    let user: Option<User> = self
      .retry
      .run("read user", |_| get_as::<User>(self.store.as_ref(), Collection::Users, user_id.as_str()))
      .await
      .map_err(|e| AppError::from_store("read user", e))?;
    let role = user.as_ref().map(|u| u.role).unwrap_or_default();
    debug!(%user_id, ?role, "Role resolved.");

    Ok(Session::signed_in(Actor {
      user_id,
      email: normalize_email(email),
      role,
    }))
  }

  pub fn sign_out(&self, session: Session) -> Session {
    if let Some(actor) = session.actor() {
      info!(user_id = %actor.user_id, "Signed out.");
    }
    Session::anonymous()
  }

  /// Sets a user's role. Used when seeding an administrator.
  #[instrument(name = "Authenticator::set_role", skip(self), err(Display))]
  pub async fn set_role(&self, user_id: &UserId, role: Role) -> Result<()> {
    let write = DocumentWrite::from_value(&serde_json::json!({ "role": role }))?;
    self
      .retry
      .run("update user role", |_| self.store.update(Collection::Users, user_id.as_str(), write.clone()))
      .await
      .map_err(|e| AppError::from_store("update user role", e))
  }
}
