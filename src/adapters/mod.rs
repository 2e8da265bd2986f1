// Adapters layer: concrete implementations of the domain ports (serial link, GPIO, simulator).

pub mod gpio;
pub mod serial;
pub mod simulator;

pub use gpio::{LogOnlyGate, NoopPower, SysfsGpio};
pub use serial::SerialTransport;
pub use simulator::SimulatedModem;
