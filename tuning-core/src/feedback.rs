//! Closed-loop RX tuning correction from IF-count estimates.
//!
//! During steady-state operation, each received frame yields an IF count —
//! a proxy for how far the local oscillator sits from nominal. This module
//! keeps a short rolling window per channel and nudges the RX fine code
//! when the average drifts out of band.

use crate::algebra::{AlgebraError, TuningCode};
use crate::config::{IF_NOMINAL, IF_WINDOW_SIZE, MAX_IF_OFFSET, MIN_IF_ESTIMATES};

/// A ring buffer of the most recent IF estimates for one channel.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IfEstimateWindow {
    samples: [u32; IF_WINDOW_SIZE],
    head: usize,
    full: bool,
}

impl Default for IfEstimateWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl IfEstimateWindow {
    pub const fn new() -> Self {
        IfEstimateWindow {
            samples: [0; IF_WINDOW_SIZE],
            head: 0,
            full: false,
        }
    }

    pub fn len(&self) -> usize {
        if self.full {
            IF_WINDOW_SIZE
        } else {
            self.head
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, estimate: u32) {
        self.samples[self.head] = estimate;
        self.head += 1;
        if self.head == IF_WINDOW_SIZE {
            self.head = 0;
            self.full = true;
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.full = false;
    }

    pub fn average(&self) -> u32 {
        let len = self.len();
        if len == 0 {
            return 0;
        }
        let sum: u32 = if self.full {
            self.samples.iter().sum()
        } else {
            self.samples[..self.head].iter().sum()
        };
        sum / len as u32
    }
}

/// Outcome of feeding one frame through [`TuningFeedback::on_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FeedbackAction {
    /// The estimate was invalid (zero) and was not recorded.
    Ignored,
    /// The window does not yet have enough samples to act.
    Accumulating,
    /// No correction needed; average was within band.
    OnFrequency,
    /// A correction was applied; the window has been cleared.
    Corrected(TuningCode),
}

/// Per-channel feedback state: one window plus the running correction.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningFeedback {
    window: IfEstimateWindow,
}

impl TuningFeedback {
    pub const fn new() -> Self {
        TuningFeedback {
            window: IfEstimateWindow::new(),
        }
    }

    pub fn window(&self) -> &IfEstimateWindow {
        &self.window
    }

    /// Feed one frame's IF estimate, returning the action taken.
    ///
    /// Direction convention (documented here, see DESIGN.md for the
    /// resolved open question): an average *above* nominal means the local
    /// oscillator is running low, so the fine code is decremented to walk
    /// it up; an average *below* nominal increments the fine code.
    pub fn on_frame(
        &mut self,
        code: TuningCode,
        if_estimate: u32,
    ) -> Result<FeedbackAction, AlgebraError> {
        if if_estimate == 0 {
            return Ok(FeedbackAction::Ignored);
        }

        self.window.push(if_estimate);

        if self.window.len() < MIN_IF_ESTIMATES {
            return Ok(FeedbackAction::Accumulating);
        }

        let avg = self.window.average();

        if avg > IF_NOMINAL + MAX_IF_OFFSET {
            let corrected = code.decrement_fine(1)?;
            self.window.clear();
            Ok(FeedbackAction::Corrected(corrected))
        } else if avg + MAX_IF_OFFSET < IF_NOMINAL {
            let corrected = code.increment_fine(1)?;
            self.window.clear();
            Ok(FeedbackAction::Corrected(corrected))
        } else {
            Ok(FeedbackAction::OnFrequency)
        }
    }
}
