pub mod context;
pub mod dispatcher;
pub mod listener;

pub use context::{GateContext, GateSettings, GateTasks};
pub use dispatcher::Handled;
