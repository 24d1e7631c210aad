//! Frequency-tuning algorithms for a crystal-less radio transceiver.
//!
//! This crate is hardware-free: the tuning-code algebra, sweep iterator,
//! channel registry, calibration state machine, and feedback controller
//! never touch a radio or a timer directly. Callers (firmware or tests)
//! drive the state machine and apply its decisions to real hardware.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod algebra;
pub mod calibration;
pub mod config;
pub mod feedback;
pub mod registry;
pub mod sweep;

pub use algebra::{AlgebraError, TuningCode};
pub use calibration::{CalibrationError, ChannelCalEngine, State};
pub use feedback::{FeedbackAction, IfEstimateWindow, TuningFeedback};
pub use registry::{ChannelInfo, ChannelMode, ChannelModeInfo, ChannelRegistry};
pub use sweep::{SweepConfig, SweepError, SweepRange};
