// core/src/lib.rs

//! Quire: a small asynchronous staged-workflow engine.
//!
//! A `Flow` is an ordered list of named stages run against one shared state value:
//!  - `before` / `on` / `after` handlers per stage, all async.
//!  - Optional stages and per-stage `skip_if` predicates.
//!  - Early halting from any handler (`StageControl::Halt`).
//!  - Stage insertion and removal after a flow has been built.
//!  - A type-keyed registry (`Flows`) that dispatches on the state type.
//!
//! ```ignore
//! let mut flow = Flow::<Order, AppError>::new("checkout", &[("validate", false, None), ("persist", false, None)]);
//! flow.on("validate", |ctx: Shared<Order>| async move { /* ... */ Ok::<_, AppError>(StageControl::Continue) });
//! ```

pub mod core;
pub mod error;
pub mod flow;
pub mod registry;

pub use crate::core::control::{FlowOutcome, StageControl};
pub use crate::core::handler::{Handler, HandlerFuture, Phase};
pub use crate::core::shared::Shared;
pub use crate::core::stage::{SkipIf, StageDef};

pub use crate::flow::Flow;

pub use crate::error::{QuireError, QuireResult};

pub use crate::registry::Flows;
