pub mod classifier;
pub mod interpreter;
pub mod modem;
pub mod number;
pub mod phonebook;
pub mod queue;
pub mod sms;

pub use crate::domain::model::{
    AddOutcome, AdminCommand, AtOutcome, DeleteOutcome, IndexRange, ModemState, Notification,
    NumberType, PhonebookEntry, QueryOutcome, SmsMessage,
};
pub use crate::domain::ports::{GateActuator, PowerControl, Transport};
pub use crate::utils::error::Result;
