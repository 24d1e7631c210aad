//! Tunable constants for the tuning subsystem.
//!
//! Grouped here instead of scattered across call sites, the way protocol
//! constants live in one module rather than at each use.

/// Every tuning code field is clamped to this range.
pub const TUNING_MAX_CODE: u8 = 31;

/// Fine code to resume at after crossing a mid boundary.
pub const FINE_PER_MID_TRANSITION: u8 = 9;

/// Mid code to resume at after crossing a coarse boundary.
///
/// Two deployed builds disagreed on this value (13 vs 14). Both are kept
/// available; see DESIGN.md for the chosen default.
#[cfg(not(feature = "mid-transition-14"))]
pub const MID_PER_COARSE_TRANSITION: u8 = 13;
#[cfg(feature = "mid-transition-14")]
pub const MID_PER_COARSE_TRANSITION: u8 = 14;

/// Mid codes separating two adjacent 802.15.4 channels at the same coarse.
///
/// Also disputed between deployments (5 vs 6); see DESIGN.md.
#[cfg(not(feature = "channel-spacing-6"))]
pub const MID_CODES_BETWEEN_CHANNELS: u8 = 5;
#[cfg(feature = "channel-spacing-6")]
pub const MID_CODES_BETWEEN_CHANNELS: u8 = 6;

/// Mid codes separating RX and TX tuning for the same channel.
pub const MID_CODES_BETWEEN_RX_AND_TX: u8 = 1;

/// Mid code at or above which a coarse rollover is considered imminent.
pub const MID_CODE_THRESHOLD: u8 = 24;

/// Lowest 802.15.4 channel number this subsystem tunes.
pub const MIN_CHANNEL: u8 = 11;

/// Highest 802.15.4 channel number this subsystem tunes.
pub const MAX_CHANNEL: u8 = 26;

/// Number of channels covered by the registry.
pub const NUM_CHANNELS: usize = (MAX_CHANNEL - MIN_CHANNEL + 1) as usize;

/// Default channel used to discover the first RX tuning code.
pub const CHANNEL_CAL_INITIAL_CHANNEL: u8 = 17;

/// Consecutive failures before a channel's code is advanced.
pub const MAX_NUM_FAILURES: u8 = 2;

/// Size of the IF estimate ring buffer, per channel.
pub const IF_WINDOW_SIZE: usize = 10;

/// Minimum samples in the window before the feedback controller acts.
pub const MIN_IF_ESTIMATES: usize = IF_WINDOW_SIZE / 3;

/// Nominal IF estimate when exactly on frequency.
pub const IF_NOMINAL: u32 = 500;

/// Band around [`IF_NOMINAL`] considered on-frequency.
pub const MAX_IF_OFFSET: u32 = 25;

/// Maximum averaged TX codes the peer coordinator keeps per channel.
pub const MAX_TX_CODES_PER_CHANNEL: usize = 4;

/// Maximum raw codes the peer coordinator records per channel before
/// averaging; beyond this, older entries are silently dropped.
pub const MAX_RECORDED_TX_CODES: usize = 128;

/// Short RX listen timeout, in milliseconds (bare-metal variant).
pub const RX_TIMEOUT_SHORT_MS: u32 = 500;

/// Long RX listen timeout used near a coarse rollover, in milliseconds.
pub const RX_TIMEOUT_LONG_MS: u32 = 2_000;

/// TX ACK wait timeout, in milliseconds (peer side).
pub const TX_ACK_TIMEOUT_MS: u32 = 16;
