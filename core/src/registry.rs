// core/src/registry.rs

//! `Flows<E>`: flows keyed by the type of state they run on.
//!
//! Callers hand in a `Shared<T>` and get back the outcome of whichever flow was
//! registered for `T`, with every error mapped into the application error `E`.

use crate::core::control::FlowOutcome;
use crate::core::shared::Shared;
use crate::error::QuireError;
use crate::flow::Flow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait ErasedFlow<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  fn name(&self) -> &str;

  /// `ctx` must hold a `Shared<T>` for the `T` this runner was registered with.
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr>;
}

struct FlowRunner<T, FlowErr, AppErr>
where
  T: 'static + Send + Sync,
  FlowErr: std::error::Error + From<QuireError> + Send + Sync + 'static,
{
  flow: Arc<Flow<T, FlowErr>>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<T, FlowErr, AppErr> ErasedFlow<AppErr> for FlowRunner<T, FlowErr, AppErr>
where
  T: 'static + Send + Sync,
  FlowErr: std::error::Error + From<QuireError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<FlowErr> + From<QuireError> + Send + Sync + 'static,
{
  fn name(&self) -> &str {
    self.flow.name()
  }

  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr> {
    let typed = ctx.downcast::<Shared<T>>().map_err(|_| {
      AppErr::from(QuireError::ContextMismatch {
        expected_type: std::any::type_name::<Shared<T>>().to_string(),
      })
    })?;
    self.flow.run(*typed).await.map_err(AppErr::from)
  }
}

/// Registry of flows, one per state type.
pub struct Flows<AppErr = QuireError>
where
  AppErr: std::error::Error + From<QuireError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn ErasedFlow<AppErr>>>>,
}

impl<AppErr> Flows<AppErr>
where
  AppErr: std::error::Error + From<QuireError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      flows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `flow` for state type `T`, replacing any earlier registration.
  pub fn register<T, FlowErr>(&self, flow: Flow<T, FlowErr>)
  where
    T: 'static + Send + Sync,
    FlowErr: std::error::Error + From<QuireError> + Send + Sync + 'static,
    AppErr: From<FlowErr>,
  {
    event!(Level::DEBUG, flow = %flow.name(), context_type = %std::any::type_name::<T>(), "Registering flow.");
    let runner = FlowRunner::<T, FlowErr, AppErr> {
      flow: Arc::new(flow),
      _app_err: PhantomData,
    };
    if let Some(previous) = self.flows.write().insert(TypeId::of::<T>(), Arc::new(runner)) {
      event!(Level::WARN, replaced = %previous.name(), "Flow registration replaced an existing flow.");
    }
  }

  pub fn contains<T: 'static + Send + Sync>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<T>())
  }

  /// Runs the flow registered for `T`.
  pub async fn run<T>(&self, ctx: Shared<T>) -> Result<FlowOutcome, AppErr>
  where
    T: 'static + Send + Sync,
  {
    let runner = self.flows.read().get(&TypeId::of::<T>()).cloned().ok_or_else(|| {
      let context_type = std::any::type_name::<T>().to_string();
      event!(Level::ERROR, %context_type, "No flow registered for context type.");
      AppErr::from(QuireError::FlowNotRegistered { context_type })
    })?;

    event!(Level::DEBUG, flow = %runner.name(), "Dispatching flow.");
    runner.run_erased(Box::new(ctx)).await
  }
}

impl<AppErr> Default for Flows<AppErr>
where
  AppErr: std::error::Error + From<QuireError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
