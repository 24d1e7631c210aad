//! Collaborator traits and the bare-metal orchestrator that drives
//! [`tuning_core`]'s calibration engine against real hardware.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod collaborator;
pub mod driver;
pub mod mac_driver;

pub use collaborator::{
    CellType, Direction, Mac, NamedTimer, NullMac, NullTrace, Radio, ReceivedFrame, Timer, Trace,
};
pub use driver::{BareMetalDriver, DriverError};
pub use mac_driver::{DriverError as EventDrivenDriverError, EventDrivenDriver};
