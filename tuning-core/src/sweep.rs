//! Ordered enumeration of tuning codes inside a bounded box.
//!
//! The sweep iterator does not reuse the algebra's carry rules: a sweep is a
//! local search inside an explicit `SweepConfig` box, not the oscillator's
//! global code space, so overflow here just means "left the box" rather
//! than "crossed into the next coarse".

use crate::algebra::TuningCode;
use crate::config::TUNING_MAX_CODE;

/// An inclusive `[start, end]` range for one tuning-code field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SweepRange {
    pub start: u8,
    pub end: u8,
}

impl SweepRange {
    pub const fn new(start: u8, end: u8) -> Self {
        SweepRange { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end && self.end <= TUNING_MAX_CODE
    }

    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    pub fn midpoint(&self) -> u8 {
        self.start + (self.end - self.start) / 2
    }
}

/// A box in `(coarse, mid, fine)` space to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SweepConfig {
    pub coarse: SweepRange,
    pub mid: SweepRange,
    pub fine: SweepRange,
}

/// A `SweepConfig` failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SweepError {
    InvalidRange,
}

impl SweepConfig {
    pub const fn new(coarse: SweepRange, mid: SweepRange, fine: SweepRange) -> Self {
        SweepConfig { coarse, mid, fine }
    }

    pub fn validate(&self) -> Result<(), SweepError> {
        if self.coarse.is_valid() && self.mid.is_valid() && self.fine.is_valid() {
            Ok(())
        } else {
            Err(SweepError::InvalidRange)
        }
    }

    fn ping_pong_active(&self) -> bool {
        self.coarse.is_degenerate() && !self.mid.is_degenerate()
    }

    fn end_code(&self) -> TuningCode {
        TuningCode::new(self.coarse.end, self.mid.end, self.fine.end)
    }
}

/// Position a code at the start of `cfg`.
///
/// If the coarse range is pinned to a single value, mid starts at the
/// midpoint of its range instead of at `mid.start`, to scan outward from
/// the empirically best coarse.
pub fn init_for_sweep(cfg: &SweepConfig) -> Result<TuningCode, SweepError> {
    cfg.validate()?;
    let mid = if cfg.coarse.is_degenerate() {
        cfg.mid.midpoint()
    } else {
        cfg.mid.start
    };
    Ok(TuningCode::new(cfg.coarse.start, mid, cfg.fine.start))
}

/// Whether `code` is at or past the end of `cfg`'s box.
///
/// The iteration convention is "use the code, then check `end_of_sweep`":
/// the final code inside the box is a valid value to use, and
/// `end_of_sweep` becomes true exactly when it is reached.
pub fn end_of_sweep(code: TuningCode, cfg: &SweepConfig) -> bool {
    (code.coarse, code.mid, code.fine) >= (cfg.coarse.end, cfg.mid.end, cfg.fine.end)
}

/// Advance `code` by one fine step within `cfg`, carrying into mid (and
/// then coarse) on overflow past `fine.end`.
pub fn increment_fine_for_sweep(code: TuningCode, cfg: &SweepConfig) -> TuningCode {
    if code.fine < cfg.fine.end {
        TuningCode {
            fine: code.fine + 1,
            ..code
        }
    } else {
        increment_mid_for_sweep(code, cfg)
    }
}

/// Advance `code` by one mid step within `cfg`, resetting fine to
/// `fine.start`. Uses a ping-pong schedule around the mid midpoint when
/// coarse is pinned and mid is a genuine range.
pub fn increment_mid_for_sweep(code: TuningCode, cfg: &SweepConfig) -> TuningCode {
    if cfg.ping_pong_active() {
        let center = cfg.mid.midpoint() as i16;
        let offset = code.mid as i16 - center;
        let next_offset = if offset <= 0 { -offset + 1 } else { -offset };
        let next_mid = center + next_offset;
        if next_mid < cfg.mid.start as i16 || next_mid > cfg.mid.end as i16 {
            // window exhausted: re-center instead of pinning to an extreme,
            // so the next cycle scans outward from the middle again
            return TuningCode::new(code.coarse, cfg.mid.midpoint(), cfg.fine.start);
        }
        return TuningCode::new(code.coarse, next_mid as u8, cfg.fine.start);
    }

    if code.mid < cfg.mid.end {
        TuningCode::new(code.coarse, code.mid + 1, cfg.fine.start)
    } else if code.coarse < cfg.coarse.end {
        TuningCode::new(code.coarse + 1, cfg.mid.start, cfg.fine.start)
    } else {
        cfg.end_code()
    }
}
