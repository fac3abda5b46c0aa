pub mod control;
pub mod handler;
pub mod shared;
pub mod stage;

pub use control::{FlowOutcome, StageControl};
pub use handler::{Handler, HandlerFuture, Phase};
pub use shared::Shared;
pub use stage::{SkipIf, StageDef};
