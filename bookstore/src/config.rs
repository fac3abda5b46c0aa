// bookstore/src/config.rs

use crate::errors::{AppError, Result};
use crate::store::RetryPolicy;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Who gets their checkout reflected in book stock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StockPolicy {
  /// Only sessions with an elevated role decrement stock.
  #[default]
  ElevatedOnly,
  Always,
  Never,
}

impl StockPolicy {
  pub fn applies(&self, elevated: bool) -> bool {
    match self {
      StockPolicy::ElevatedOnly => elevated,
      StockPolicy::Always => true,
      StockPolicy::Never => false,
    }
  }
}

impl FromStr for StockPolicy {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "elevated-only" | "elevated_only" => Ok(StockPolicy::ElevatedOnly),
      "always" => Ok(StockPolicy::Always),
      "never" => Ok(StockPolicy::Never),
      other => Err(AppError::Config(format!(
        "Invalid BOOKSTORE_STOCK_POLICY '{}' (expected elevated-only, always or never)",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub retry_max_attempts: u32,
  pub retry_base_delay: Duration,
  pub stock_policy: StockPolicy,
  /// Oldest caller-supplied cart summary the checkout still accepts.
  pub summary_max_age: Duration,
  pub log_json: bool,
  pub seed_catalog: bool,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      retry_max_attempts: 3,
      retry_base_delay: Duration::from_millis(50),
      stock_policy: StockPolicy::default(),
      summary_max_age: Duration::from_secs(300),
      log_json: false,
      seed_catalog: true,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Builds the config from any key lookup; unset keys take their defaults.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let defaults = Self::default();

    let retry_max_attempts = parse_or(&lookup, "BOOKSTORE_RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts)?;
    if retry_max_attempts == 0 {
      return Err(AppError::Config(
        "BOOKSTORE_RETRY_MAX_ATTEMPTS must be at least 1".to_string(),
      ));
    }
    let retry_base_delay = Duration::from_millis(parse_or(
      &lookup,
      "BOOKSTORE_RETRY_BASE_DELAY_MS",
      defaults.retry_base_delay.as_millis() as u64,
    )?);
    let stock_policy = match lookup("BOOKSTORE_STOCK_POLICY") {
      Some(raw) => raw.parse()?,
      None => defaults.stock_policy,
    };
    let summary_max_age = Duration::from_secs(parse_or(
      &lookup,
      "BOOKSTORE_SUMMARY_MAX_AGE_SECS",
      defaults.summary_max_age.as_secs(),
    )?);
    let log_json = parse_or(&lookup, "BOOKSTORE_LOG_JSON", defaults.log_json)?;
    let seed_catalog = parse_or(&lookup, "BOOKSTORE_SEED_CATALOG", defaults.seed_catalog)?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      retry_max_attempts,
      retry_base_delay,
      stock_policy,
      summary_max_age,
      log_json,
      seed_catalog,
    })
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy::new(self.retry_max_attempts, self.retry_base_delay)
  }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match lookup(key) {
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", key, raw, e))),
    None => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn unset_keys_take_defaults() {
    let cfg = AppConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg.retry_max_attempts, 3);
    assert_eq!(cfg.retry_base_delay, Duration::from_millis(50));
    assert_eq!(cfg.stock_policy, StockPolicy::ElevatedOnly);
    assert_eq!(cfg.summary_max_age, Duration::from_secs(300));
    assert!(!cfg.log_json);
    assert!(cfg.seed_catalog);
  }

  #[test]
  fn values_are_parsed() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
      ("BOOKSTORE_RETRY_MAX_ATTEMPTS", "5"),
      ("BOOKSTORE_RETRY_BASE_DELAY_MS", "10"),
      ("BOOKSTORE_STOCK_POLICY", "Always"),
      ("BOOKSTORE_LOG_JSON", "true"),
    ]))
    .unwrap();
    assert_eq!(cfg.retry_policy(), RetryPolicy::new(5, Duration::from_millis(10)));
    assert_eq!(cfg.stock_policy, StockPolicy::Always);
    assert!(cfg.log_json);
  }

  #[test]
  fn bad_values_are_config_errors() {
    for pairs in [
      [("BOOKSTORE_RETRY_MAX_ATTEMPTS", "many")],
      [("BOOKSTORE_RETRY_MAX_ATTEMPTS", "0")],
      [("BOOKSTORE_STOCK_POLICY", "sometimes")],
      [("BOOKSTORE_SEED_CATALOG", "yes")],
    ] {
      let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
      assert!(matches!(err, AppError::Config(_)), "{:?}", pairs);
    }
  }

  #[test]
  fn stock_policy_gating() {
    assert!(StockPolicy::ElevatedOnly.applies(true));
    assert!(!StockPolicy::ElevatedOnly.applies(false));
    assert!(StockPolicy::Always.applies(false));
    assert!(!StockPolicy::Never.applies(true));
  }
}
