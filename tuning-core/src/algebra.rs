//! Arithmetic on the `(coarse, mid, fine)` tuning-code space.
//!
//! The three fields are not a plain base-32 counter: each boundary has an
//! empirically measured overlap width (see [`crate::config`]), so carrying
//! past one field's top or bottom lands partway into the neighbor rather
//! than at 0 or 31. Every operation here is checked: crossing past
//! `coarse == 31` going up, or `coarse == 0` going down, is an error rather
//! than a silent wrap or panic.

use crate::config::{
    FINE_PER_MID_TRANSITION, MID_CODES_BETWEEN_CHANNELS, MID_CODES_BETWEEN_RX_AND_TX,
    MID_PER_COARSE_TRANSITION, TUNING_MAX_CODE,
};

/// An oscillator tuning setting.
///
/// Fields are always kept within `[0, 31]`; there is no way to construct or
/// mutate a `TuningCode` outside that range through this API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningCode {
    pub coarse: u8,
    pub mid: u8,
    pub fine: u8,
}

/// An operation that would move a field outside `[0, 31]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlgebraError {
    /// The coarse field would have gone above 31.
    CoarseOverflow,
    /// The coarse field would have gone below 0.
    CoarseUnderflow,
}

impl TuningCode {
    /// Build a code, clamping each field into `[0, 31]`.
    pub const fn new(coarse: u8, mid: u8, fine: u8) -> Self {
        TuningCode {
            coarse: clamp(coarse),
            mid: clamp(mid),
            fine: clamp(fine),
        }
    }

    /// Advance fine by `n`, carrying into mid (and then coarse) on overflow.
    pub fn increment_fine(self, n: u8) -> Result<Self, AlgebraError> {
        let mut code = self;
        for _ in 0..n {
            code = code.step_fine_up()?;
        }
        Ok(code)
    }

    /// Symmetric to [`Self::increment_fine`].
    pub fn decrement_fine(self, n: u8) -> Result<Self, AlgebraError> {
        let mut code = self;
        for _ in 0..n {
            code = code.step_fine_down()?;
        }
        Ok(code)
    }

    /// Advance mid by `n`, carrying into coarse on overflow.
    pub fn increment_mid(self, n: u8) -> Result<Self, AlgebraError> {
        let mut code = self;
        for _ in 0..n {
            code = code.step_mid_up()?;
        }
        Ok(code)
    }

    /// Symmetric to [`Self::increment_mid`].
    pub fn decrement_mid(self, n: u8) -> Result<Self, AlgebraError> {
        let mut code = self;
        for _ in 0..n {
            code = code.step_mid_down()?;
        }
        Ok(code)
    }

    /// Correct for a mid value sitting in the overlap band near a coarse
    /// boundary: if `mid < threshold`, borrow a coarse step; if
    /// `mid + threshold > 31`, carry one. Idempotent outside the band.
    pub fn rollover_mid(self, threshold: u8) -> Result<Self, AlgebraError> {
        if self.mid < threshold {
            let coarse = self
                .coarse
                .checked_sub(1)
                .ok_or(AlgebraError::CoarseUnderflow)?;
            Ok(TuningCode {
                coarse,
                mid: clamp(self.mid + MID_PER_COARSE_TRANSITION),
                fine: self.fine,
            })
        } else if self.mid.saturating_add(threshold) > TUNING_MAX_CODE {
            if self.coarse >= TUNING_MAX_CODE {
                return Err(AlgebraError::CoarseOverflow);
            }
            Ok(TuningCode {
                coarse: self.coarse + 1,
                mid: self.mid.saturating_sub(MID_PER_COARSE_TRANSITION),
                fine: self.fine,
            })
        } else {
            Ok(self)
        }
    }

    /// Estimate the same mode's code on the channel one step below.
    pub fn estimate_previous_channel(self) -> Result<Self, AlgebraError> {
        self.decrement_mid(MID_CODES_BETWEEN_CHANNELS)
    }

    /// Estimate the same mode's code on the channel one step above.
    pub fn estimate_next_channel(self) -> Result<Self, AlgebraError> {
        self.increment_mid(MID_CODES_BETWEEN_CHANNELS)
    }

    /// Estimate this channel's TX code, given the RX code.
    pub fn estimate_tx_from_rx(self) -> Result<Self, AlgebraError> {
        self.decrement_mid(MID_CODES_BETWEEN_RX_AND_TX)
    }

    /// Estimate this channel's RX code, given the TX code.
    pub fn estimate_rx_from_tx(self) -> Result<Self, AlgebraError> {
        self.increment_mid(MID_CODES_BETWEEN_RX_AND_TX)
    }

    fn step_fine_up(self) -> Result<Self, AlgebraError> {
        if self.fine < TUNING_MAX_CODE {
            Ok(TuningCode {
                fine: self.fine + 1,
                ..self
            })
        } else {
            let carried = self.step_mid_up()?;
            Ok(TuningCode {
                fine: FINE_PER_MID_TRANSITION,
                ..carried
            })
        }
    }

    fn step_fine_down(self) -> Result<Self, AlgebraError> {
        if self.fine == FINE_PER_MID_TRANSITION {
            let carried = self.step_mid_down()?;
            Ok(TuningCode {
                fine: TUNING_MAX_CODE,
                ..carried
            })
        } else if self.fine == 0 {
            // degenerate: below the overlap threshold with no lower
            // neighbor to borrow from along this axis alone
            let carried = self.step_mid_down()?;
            Ok(TuningCode {
                fine: TUNING_MAX_CODE,
                ..carried
            })
        } else {
            Ok(TuningCode {
                fine: self.fine - 1,
                ..self
            })
        }
    }

    fn step_mid_up(self) -> Result<Self, AlgebraError> {
        if self.mid < TUNING_MAX_CODE {
            Ok(TuningCode {
                mid: self.mid + 1,
                ..self
            })
        } else {
            if self.coarse >= TUNING_MAX_CODE {
                return Err(AlgebraError::CoarseOverflow);
            }
            Ok(TuningCode {
                coarse: self.coarse + 1,
                mid: MID_PER_COARSE_TRANSITION,
                fine: self.fine,
            })
        }
    }

    fn step_mid_down(self) -> Result<Self, AlgebraError> {
        if self.mid == MID_PER_COARSE_TRANSITION || self.mid == 0 {
            if self.coarse == 0 {
                return Err(AlgebraError::CoarseUnderflow);
            }
            Ok(TuningCode {
                coarse: self.coarse - 1,
                mid: TUNING_MAX_CODE,
                fine: self.fine,
            })
        } else {
            Ok(TuningCode {
                mid: self.mid - 1,
                ..self
            })
        }
    }
}

const fn clamp(val: u8) -> u8 {
    if val > TUNING_MAX_CODE {
        TUNING_MAX_CODE
    } else {
        val
    }
}
