pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliArgs;

pub use crate::app::{GateContext, GateSettings, GateTasks, Handled};
pub use crate::config::GatekeeperConfig;
pub use crate::core::modem::{Modem, ModemTimings};
pub use crate::core::phonebook::{AuthorizationStore, SlotStrategy};
pub use crate::utils::error::{GateError, Result};
