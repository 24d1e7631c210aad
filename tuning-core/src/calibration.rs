//! The two-phase channel calibration protocol.
//!
//! `ChannelCalEngine` is deliberately hardware-free: it never calls a radio
//! or a timer. Callers drive it with events (`timer_expired`,
//! `frame_received`, `rx_success`, ...) and apply the codes it hands back to
//! real hardware themselves. This lets the same engine run under a
//! bare-metal main loop or behind a MAC event dispatcher, and makes the
//! protocol itself exhaustively unit-testable without any collaborator
//! mocks.

use crate::algebra::{AlgebraError, TuningCode};
use crate::config::{
    CHANNEL_CAL_INITIAL_CHANNEL, MAX_NUM_FAILURES, MID_CODE_THRESHOLD, MID_PER_COARSE_TRANSITION,
};
use crate::registry::{ChannelInfo, ChannelMode, ChannelModeInfo, ChannelRegistry};
use crate::sweep::{self, SweepConfig, SweepError, SweepRange};

/// Calibration engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Init,
    InitialRx,
    InitialRxIdle,
    InitialRxReceived,
    RemainingRx,
    RxDone,
    TxCal,
    Feedback,
}

/// An operation was attempted from a state that does not support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    WrongState,
    Sweep(SweepError),
    Algebra(AlgebraError),
}

impl From<SweepError> for CalibrationError {
    fn from(e: SweepError) -> Self {
        CalibrationError::Sweep(e)
    }
}

impl From<AlgebraError> for CalibrationError {
    fn from(e: AlgebraError) -> Self {
        CalibrationError::Algebra(e)
    }
}

/// The per-channel, per-mode calibration and feedback state machine.
pub struct ChannelCalEngine {
    state: State,
    initial_channel: u8,
    registry: ChannelRegistry,
    /// True if the last code discovered in `INITIAL_RX` had a mid at or
    /// above [`MID_CODE_THRESHOLD`], meaning the next sweep window should
    /// use the long timeout (caller's concern; exposed for the driver).
    next_timeout_is_long: bool,
}

impl ChannelCalEngine {
    /// Build a new engine, entering `INIT` with every channel sharing
    /// `initial_sweep` as its starting sweep config.
    pub fn new(
        initial_channel: u8,
        initial_sweep: SweepConfig,
    ) -> Result<Self, CalibrationError> {
        initial_sweep.validate()?;
        let code = sweep::init_for_sweep(&initial_sweep)?;
        let mode_info = ChannelModeInfo::new(code, initial_sweep);
        let registry = ChannelRegistry::new(ChannelInfo {
            rx: mode_info,
            tx: mode_info,
        });
        Ok(ChannelCalEngine {
            state: State::Init,
            initial_channel,
            registry,
            next_timeout_is_long: true,
        })
    }

    /// Convenience constructor using the default initial channel.
    pub fn with_default_channel(initial_sweep: SweepConfig) -> Result<Self, CalibrationError> {
        Self::new(CHANNEL_CAL_INITIAL_CHANNEL, initial_sweep)
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ChannelRegistry {
        &mut self.registry
    }

    pub fn initial_channel(&self) -> u8 {
        self.initial_channel
    }

    /// Whether the next RX listen window should use the long timeout.
    pub fn next_timeout_is_long(&self) -> bool {
        self.next_timeout_is_long
    }

    fn initial_rx_code(&self) -> TuningCode {
        // unwrap is ok: the initial channel always exists by construction
        self.registry
            .get_tuning_code(self.initial_channel, ChannelMode::Rx)
            .unwrap()
    }

    fn set_initial_rx_code(&mut self, code: TuningCode) {
        self.registry
            .set_tuning_code(self.initial_channel, ChannelMode::Rx, code);
    }

    /// Enter `INITIAL_RX`, returning the code to tune the radio to and
    /// enable RX on.
    pub fn begin_initial_rx(&mut self) -> Result<TuningCode, CalibrationError> {
        if self.state != State::Init {
            return Err(CalibrationError::WrongState);
        }
        self.state = State::InitialRxIdle;
        Ok(self.initial_rx_code())
    }

    /// The RX listen timer fired with no frame received: advance the
    /// sweep and return the next code to retune to.
    pub fn timer_expired(&mut self) -> Result<TuningCode, CalibrationError> {
        if self.state != State::InitialRxIdle {
            return Err(CalibrationError::WrongState);
        }
        let sweep_cfg = self
            .registry
            .get(self.initial_channel)
            .unwrap()
            .rx
            .sweep_config;
        let next = sweep::increment_fine_for_sweep(self.initial_rx_code(), &sweep_cfg);
        self.set_initial_rx_code(next);
        self.next_timeout_is_long = next.mid >= MID_CODE_THRESHOLD;
        Ok(next)
    }

    /// A valid frame arrived while idle: snapshot the discovered code and
    /// move to `INITIAL_RX_RECEIVED`.
    pub fn frame_received(&mut self, discovered: TuningCode) -> Result<(), CalibrationError> {
        if self.state != State::InitialRxIdle {
            return Err(CalibrationError::WrongState);
        }
        self.set_initial_rx_code(discovered);
        self.state = State::InitialRxReceived;
        Ok(())
    }

    /// Record the discovered code (main-loop side of `INITIAL_RX_RECEIVED`),
    /// latch `calibrated`, and run phase 2 (`init_remaining_sweeps`).
    pub fn complete_initial_rx(&mut self) -> Result<(), CalibrationError> {
        if self.state != State::InitialRxReceived {
            return Err(CalibrationError::WrongState);
        }
        {
            let info = self.registry.get_mut(self.initial_channel).unwrap();
            info.rx.calibrated = true;
            info.rx.num_failures = 0;
        }
        self.state = State::RxDone;
        self.init_remaining_sweeps()?;
        self.state = State::RemainingRx;
        Ok(())
    }

    /// Phase 2: narrow the initial channel's RX window around the
    /// discovered code, seed its TX estimate, then extrapolate outward to
    /// every other channel.
    fn init_remaining_sweeps(&mut self) -> Result<(), CalibrationError> {
        let discovered = self.initial_rx_code();

        // step 1: narrow window, widened by one mid code if the discovered
        // code sits near a coarse rollover.
        let k: u8 = if self.near_rollover(discovered) { 1 } else { 0 };
        let half = MID_PER_COARSE_TRANSITION.min(1 + k);
        let narrow = SweepConfig::new(
            SweepRange::new(discovered.coarse, discovered.coarse),
            SweepRange::new(
                discovered.mid.saturating_sub(half),
                (discovered.mid + half).min(31),
            ),
            SweepRange::new(0, 31),
        );
        {
            let info = self.registry.get_mut(self.initial_channel).unwrap();
            info.rx.sweep_config = narrow;
        }

        // step 2: estimate TX from RX for the initial channel.
        let tx_code = discovered.estimate_tx_from_rx()?;
        self.registry
            .set_tuning_code(self.initial_channel, ChannelMode::Tx, tx_code);

        // step 3: extrapolate outward to every other channel, both modes.
        self.extrapolate_outward(ChannelMode::Rx, discovered)?;
        self.extrapolate_outward(ChannelMode::Tx, tx_code)?;

        Ok(())
    }

    fn near_rollover(&self, code: TuningCode) -> bool {
        code.rollover_mid(MID_PER_COARSE_TRANSITION)
            .map(|rolled| rolled != code)
            .unwrap_or(false)
    }

    fn extrapolate_outward(
        &mut self,
        mode: ChannelMode,
        initial_code: TuningCode,
    ) -> Result<(), CalibrationError> {
        let mut above = initial_code;
        for channel in (self.initial_channel + 1)..=crate::config::MAX_CHANNEL {
            let prev = above;
            above = above.estimate_next_channel()?;
            self.seed_extrapolated(channel, mode, prev, above);
        }

        let mut below = initial_code;
        for channel in (crate::config::MIN_CHANNEL..self.initial_channel).rev() {
            let prev = below;
            below = below.estimate_previous_channel()?;
            self.seed_extrapolated(channel, mode, prev, below);
        }

        Ok(())
    }

    fn seed_extrapolated(
        &mut self,
        channel: u8,
        mode: ChannelMode,
        prev: TuningCode,
        estimate: TuningCode,
    ) {
        self.registry.set_tuning_code(channel, mode, estimate);
        let widen = prev.coarse.abs_diff(estimate.coarse) >= 2;
        if let Some(info) = self.registry.get_mut(channel) {
            let mode_info = match mode {
                ChannelMode::Rx => &mut info.rx,
                ChannelMode::Tx => &mut info.tx,
            };
            mode_info.tuning_code = estimate;
            if widen {
                mode_info.sweep_config.mid.start = mode_info.sweep_config.mid.start.saturating_sub(1);
                mode_info.sweep_config.mid.end = (mode_info.sweep_config.mid.end + 1).min(31);
            }
        }
    }

    /// An enhanced beacon failed to arrive on `channel`'s RX. After
    /// [`crate::config::MAX_NUM_FAILURES`] consecutive failures, advance the
    /// code by one sweep step and reset the counter.
    pub fn rx_failure(&mut self, channel: u8) -> Result<(), CalibrationError> {
        self.mode_failure(channel, ChannelMode::Rx)
    }

    /// An enhanced beacon was received on `channel`: latch calibrated and,
    /// if the TX code was never initialized, seed it from RX.
    pub fn rx_success(&mut self, channel: u8) -> Result<(), CalibrationError> {
        let rx_code = {
            let Some(info) = self.registry.get_mut(channel) else {
                return Err(CalibrationError::WrongState);
            };
            info.rx.calibrated = true;
            info.rx.num_failures = 0;
            info.rx.tuning_code
        };

        let tx_uninitialized = self
            .registry
            .get(channel)
            .map(|i| !i.tx.calibrated && i.tx.num_failures == 0)
            .unwrap_or(false);
        if tx_uninitialized {
            let tx_code = rx_code.estimate_tx_from_rx()?;
            self.registry.set_tuning_code(channel, ChannelMode::Tx, tx_code);
        }
        Ok(())
    }

    /// Symmetric to [`Self::rx_failure`], for TX ACKs.
    pub fn tx_failure(&mut self, channel: u8) -> Result<(), CalibrationError> {
        self.mode_failure(channel, ChannelMode::Tx)
    }

    /// Symmetric to [`Self::rx_success`], for TX ACKs.
    pub fn tx_success(&mut self, channel: u8) -> Result<(), CalibrationError> {
        let Some(info) = self.registry.get_mut(channel) else {
            return Err(CalibrationError::WrongState);
        };
        info.tx.calibrated = true;
        info.tx.num_failures = 0;
        Ok(())
    }

    fn mode_failure(&mut self, channel: u8, mode: ChannelMode) -> Result<(), CalibrationError> {
        let Some(info) = self.registry.get_mut(channel) else {
            return Err(CalibrationError::WrongState);
        };
        let mode_info = match mode {
            ChannelMode::Rx => &mut info.rx,
            ChannelMode::Tx => &mut info.tx,
        };
        mode_info.num_failures += 1;
        if mode_info.num_failures >= MAX_NUM_FAILURES {
            mode_info.tuning_code =
                sweep::increment_fine_for_sweep(mode_info.tuning_code, &mode_info.sweep_config);
            mode_info.num_failures = 0;
        }
        Ok(())
    }

    pub fn all_rx_calibrated(&self) -> bool {
        self.registry.all_rx_calibrated()
    }

    pub fn all_tx_calibrated(&self) -> bool {
        self.registry.all_tx_calibrated()
    }

    /// Move from per-channel RX calibration to TX confirmation, once every
    /// channel has latched `rx.calibrated`. `rx_success`/`rx_failure` remain
    /// callable afterward (a channel can still need a retune), but this
    /// marks the engine as through its first full pass.
    pub fn begin_tx_cal(&mut self) -> Result<(), CalibrationError> {
        if self.state != State::RemainingRx || !self.all_rx_calibrated() {
            return Err(CalibrationError::WrongState);
        }
        self.state = State::TxCal;
        Ok(())
    }

    /// Move from TX confirmation into steady-state feedback, once every
    /// channel has latched `tx.calibrated`.
    pub fn begin_feedback(&mut self) -> Result<(), CalibrationError> {
        if self.state != State::TxCal || !self.all_tx_calibrated() {
            return Err(CalibrationError::WrongState);
        }
        self.state = State::Feedback;
        Ok(())
    }

    /// Cancel any outstanding calibration on `channel`/`mode`, per the
    /// cancellation convention: latch `calibrated` so the next timer
    /// callback observes it and takes no further action.
    pub fn cancel(&mut self, channel: u8, mode: ChannelMode) {
        if let Some(info) = self.registry.get_mut(channel) {
            let mode_info = match mode {
                ChannelMode::Rx => &mut info.rx,
                ChannelMode::Tx => &mut info.tx,
            };
            mode_info.calibrated = true;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{MAX_CHANNEL, MIN_CHANNEL};

    fn sweep_for_s1() -> SweepConfig {
        SweepConfig::new(
            SweepRange::new(22, 22),
            SweepRange::new(15, 15),
            SweepRange::new(0, 31),
        )
    }

    // S1 — initial sweep hit on first try
    #[test]
    fn s1_initial_sweep_hit_on_first_try() {
        let mut engine = ChannelCalEngine::new(17, sweep_for_s1()).unwrap();
        let first = engine.begin_initial_rx().unwrap();
        assert_eq!(first, TuningCode::new(22, 15, 0));

        let second = engine.timer_expired().unwrap();
        assert_eq!(second, TuningCode::new(22, 15, 1));
        let third = engine.timer_expired().unwrap();
        assert_eq!(third, TuningCode::new(22, 15, 2));

        // code after the 3rd timer tick is where the peer is finally heard
        let discovered = TuningCode::new(22, 15, 3);
        engine.frame_received(discovered).unwrap();
        assert_eq!(engine.state(), State::InitialRxReceived);
        engine.complete_initial_rx().unwrap();

        assert_eq!(engine.state(), State::RemainingRx);
        assert!(engine.registry().get(17).unwrap().rx.calibrated);
        assert_eq!(
            engine.registry().get_tuning_code(17, ChannelMode::Rx),
            Some(discovered)
        );
    }

    // property 10
    #[test]
    fn timer_expirations_visit_every_code_in_config() {
        let cfg = SweepConfig::new(
            SweepRange::new(22, 22),
            SweepRange::new(15, 15),
            SweepRange::new(0, 4),
        );
        let mut engine = ChannelCalEngine::new(17, cfg).unwrap();
        let mut seen = Vec::new();
        seen.push(engine.begin_initial_rx().unwrap().fine);
        for _ in 0..4 {
            seen.push(engine.timer_expired().unwrap().fine);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    // property 11
    #[test]
    fn single_frame_transitions_and_latches() {
        let mut engine = ChannelCalEngine::new(17, sweep_for_s1()).unwrap();
        engine.begin_initial_rx().unwrap();
        engine.frame_received(TuningCode::new(22, 15, 7)).unwrap();
        engine.complete_initial_rx().unwrap();
        assert_eq!(engine.state(), State::RemainingRx);
        assert!(engine.registry().get(17).unwrap().rx.calibrated);
    }

    // property 12
    #[test]
    fn max_failures_advance_code_by_one_step() {
        let mut engine = ChannelCalEngine::new(17, sweep_for_s1()).unwrap();
        engine.begin_initial_rx().unwrap();
        engine.frame_received(TuningCode::new(22, 15, 7)).unwrap();
        engine.complete_initial_rx().unwrap();

        let before = engine.registry().get_tuning_code(18, ChannelMode::Rx).unwrap();
        engine.rx_failure(18).unwrap();
        assert_eq!(
            engine.registry().get_tuning_code(18, ChannelMode::Rx).unwrap(),
            before
        );
        engine.rx_failure(18).unwrap();
        let sweep_cfg = engine.registry().get(18).unwrap().rx.sweep_config;
        let expected = sweep::increment_fine_for_sweep(before, &sweep_cfg);
        assert_eq!(
            engine.registry().get_tuning_code(18, ChannelMode::Rx).unwrap(),
            expected
        );
        assert_eq!(engine.registry().get(18).unwrap().rx.num_failures, 0);
    }

    // S2 — single channel mode extrapolation
    #[test]
    fn s2_extrapolation_seeds_neighbors() {
        let cfg = SweepConfig::new(
            SweepRange::new(23, 23),
            SweepRange::new(15, 15),
            SweepRange::new(0, 31),
        );
        let mut engine = ChannelCalEngine::new(17, cfg).unwrap();
        engine.begin_initial_rx().unwrap();
        engine.frame_received(TuningCode::new(23, 15, 10)).unwrap();
        engine.complete_initial_rx().unwrap();

        assert_eq!(
            engine.registry().get_tuning_code(18, ChannelMode::Rx),
            Some(TuningCode::new(23, 20, 10))
        );
        assert_eq!(
            engine.registry().get_tuning_code(16, ChannelMode::Rx),
            Some(TuningCode::new(23, 10, 10))
        );
        assert_eq!(
            engine.registry().get_tuning_code(17, ChannelMode::Tx),
            Some(TuningCode::new(23, 14, 10))
        );
    }

    #[test]
    fn rx_success_seeds_tx_estimate_once() {
        let mut engine = ChannelCalEngine::new(17, sweep_for_s1()).unwrap();
        engine.begin_initial_rx().unwrap();
        engine.frame_received(TuningCode::new(22, 15, 7)).unwrap();
        engine.complete_initial_rx().unwrap();

        engine.rx_success(20).unwrap();
        assert!(engine.registry().get(20).unwrap().rx.calibrated);
        let tx_code = engine.registry().get_tuning_code(20, ChannelMode::Tx).unwrap();
        let rx_code = engine.registry().get_tuning_code(20, ChannelMode::Rx).unwrap();
        assert_eq!(tx_code, rx_code.estimate_tx_from_rx().unwrap());
    }

    #[test]
    fn all_calibrated_after_every_channel_succeeds() {
        let mut engine = ChannelCalEngine::new(17, sweep_for_s1()).unwrap();
        engine.begin_initial_rx().unwrap();
        engine.frame_received(TuningCode::new(22, 15, 7)).unwrap();
        engine.complete_initial_rx().unwrap();

        for c in MIN_CHANNEL..=MAX_CHANNEL {
            engine.rx_success(c).unwrap();
            engine.tx_success(c).unwrap();
        }
        assert!(engine.all_rx_calibrated());
        assert!(engine.all_tx_calibrated());
    }

    #[test]
    fn tx_cal_and_feedback_gated_on_full_coverage() {
        let mut engine = ChannelCalEngine::new(17, sweep_for_s1()).unwrap();
        engine.begin_initial_rx().unwrap();
        engine.frame_received(TuningCode::new(22, 15, 7)).unwrap();
        engine.complete_initial_rx().unwrap();

        assert_eq!(engine.begin_tx_cal(), Err(CalibrationError::WrongState));

        for c in MIN_CHANNEL..=MAX_CHANNEL {
            engine.rx_success(c).unwrap();
        }
        engine.begin_tx_cal().unwrap();
        assert_eq!(engine.state(), State::TxCal);

        assert_eq!(engine.begin_feedback(), Err(CalibrationError::WrongState));

        for c in MIN_CHANNEL..=MAX_CHANNEL {
            engine.tx_success(c).unwrap();
        }
        engine.begin_feedback().unwrap();
        assert_eq!(engine.state(), State::Feedback);
    }
}
