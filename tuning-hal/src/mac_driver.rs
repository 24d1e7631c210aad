//! The MAC-integrated variant: drives [`ChannelCalEngine`]'s event-driven
//! tail (`rx_success`/`rx_failure`/`tx_success`/`tx_failure`) and
//! steady-state [`TuningFeedback`] from a [`Mac`] collaborator's beacon
//! events, retuning the radio through [`Radio`] and pacing each channel's
//! expected-beacon deadline through [`NamedTimer`].
//!
//! Where [`BareMetalDriver`](crate::driver::BareMetalDriver) owns a single
//! timer for the one channel being swept in phase 1, this owns one named
//! timer per `(channel, mode)`, since several negotiated cells can be
//! outstanding across the slotframe at once. A board wires this in once its
//! MAC has synchronized and the initial two-phase sweep has reached
//! `RemainingRx`.

use tuning_core::calibration::{CalibrationError, ChannelCalEngine};
use tuning_core::config::NUM_CHANNELS;
use tuning_core::feedback::{FeedbackAction, TuningFeedback};
use tuning_core::registry::{channel_to_index, ChannelMode};

use crate::collaborator::{CellType, Direction, Mac, NamedTimer, Radio, Trace};

#[derive(Debug)]
pub enum DriverError<RE: core::fmt::Debug, TE: core::fmt::Debug> {
    Radio(RE),
    Timer(TE),
    Calibration(CalibrationError),
    UnknownChannel,
}

fn mode_cell_type(mode: ChannelMode) -> CellType {
    match mode {
        ChannelMode::Rx => CellType::Rx,
        ChannelMode::Tx => CellType::Tx,
    }
}

fn mode_direction(mode: ChannelMode) -> Direction {
    match mode {
        ChannelMode::Rx => Direction::Rx,
        ChannelMode::Tx => Direction::Tx,
    }
}

pub struct EventDrivenDriver<R, M, Nt: NamedTimer, Tr> {
    engine: ChannelCalEngine,
    radio: R,
    mac: M,
    timers: Nt,
    trace: Tr,
    feedback: [TuningFeedback; NUM_CHANNELS],
    rx_timers: [Option<Nt::Id>; NUM_CHANNELS],
    tx_timers: [Option<Nt::Id>; NUM_CHANNELS],
}

impl<R, M, Nt, Tr> EventDrivenDriver<R, M, Nt, Tr>
where
    R: Radio,
    M: Mac,
    Nt: NamedTimer,
    Tr: Trace,
    R::Error: core::fmt::Debug,
    Nt::Error: core::fmt::Debug,
{
    pub fn new(engine: ChannelCalEngine, radio: R, mac: M, timers: Nt, trace: Tr) -> Self {
        EventDrivenDriver {
            engine,
            radio,
            mac,
            timers,
            trace,
            feedback: [TuningFeedback::new(); NUM_CHANNELS],
            rx_timers: [None; NUM_CHANNELS],
            tx_timers: [None; NUM_CHANNELS],
        }
    }

    pub fn engine(&self) -> &ChannelCalEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ChannelCalEngine {
        &mut self.engine
    }

    fn timer_table(&mut self, mode: ChannelMode) -> &mut [Option<Nt::Id>; NUM_CHANNELS] {
        match mode {
            ChannelMode::Rx => &mut self.rx_timers,
            ChannelMode::Tx => &mut self.tx_timers,
        }
    }

    /// Arm (or re-arm) `channel`/`mode`'s next expected-beacon deadline, but
    /// only if the MAC has actually negotiated a cell there this
    /// slotframe -- a channel with no cell this round is left alone.
    pub fn arm_channel(
        &mut self,
        channel: u8,
        mode: ChannelMode,
        neighbor: u16,
        at_tick: u32,
    ) -> Result<(), DriverError<R::Error, Nt::Error>> {
        if !self.mac.has_negotiated_cell(neighbor, mode_cell_type(mode)) {
            return Ok(());
        }
        let slot = channel_to_index(channel).ok_or(DriverError::UnknownChannel)?;
        let id = match self.timer_table(mode)[slot] {
            Some(id) => id,
            None => {
                let id = self.timers.create().map_err(DriverError::Timer)?;
                self.timer_table(mode)[slot] = Some(id);
                id
            }
        };
        self.timers
            .schedule_absolute(id, at_tick)
            .map_err(DriverError::Timer)
    }

    /// A negotiated cell's deadline passed with no beacon seen.
    pub fn on_beacon_timeout(
        &mut self,
        channel: u8,
        mode: ChannelMode,
    ) -> Result<(), DriverError<R::Error, Nt::Error>> {
        match mode {
            ChannelMode::Rx => self.engine.rx_failure(channel),
            ChannelMode::Tx => self.engine.tx_failure(channel),
        }
        .map_err(DriverError::Calibration)?;
        self.retune(channel, mode)
    }

    /// A beacon was seen on `channel`/`mode`. `if_estimate` is only
    /// meaningful for RX -- it comes from the receiving radio's
    /// zero-crossing count; TX acks carry none.
    pub fn on_beacon_success(
        &mut self,
        channel: u8,
        mode: ChannelMode,
        if_estimate: Option<u32>,
    ) -> Result<(), DriverError<R::Error, Nt::Error>> {
        match mode {
            ChannelMode::Rx => {
                self.engine.rx_success(channel).map_err(DriverError::Calibration)?;
                if let Some(estimate) = if_estimate {
                    self.apply_feedback(channel, estimate)?;
                }
            }
            ChannelMode::Tx => {
                self.engine.tx_success(channel).map_err(DriverError::Calibration)?;
            }
        }
        Ok(())
    }

    fn apply_feedback(
        &mut self,
        channel: u8,
        if_estimate: u32,
    ) -> Result<(), DriverError<R::Error, Nt::Error>> {
        let slot = channel_to_index(channel).ok_or(DriverError::UnknownChannel)?;
        let Some(code) = self.engine.registry().get_tuning_code(channel, ChannelMode::Rx) else {
            return Ok(());
        };
        // AlgebraError here means the code was already at a field boundary;
        // there is no corrected code to apply, so treat it as on-frequency.
        let Ok(action) = self.feedback[slot].on_frame(code, if_estimate) else {
            return Ok(());
        };
        if let FeedbackAction::Corrected(corrected) = action {
            self.engine
                .registry_mut()
                .set_tuning_code(channel, ChannelMode::Rx, corrected);
            self.radio
                .set_frequency(channel, corrected)
                .map_err(DriverError::Radio)?;
            self.trace.trace_code(Direction::Rx, channel, corrected);
        }
        Ok(())
    }

    /// Re-tune to whatever code the engine currently holds for
    /// `channel`/`mode`. A no-op in effect when a timeout didn't advance the
    /// code (below `MAX_NUM_FAILURES`), since the radio is already there.
    fn retune(
        &mut self,
        channel: u8,
        mode: ChannelMode,
    ) -> Result<(), DriverError<R::Error, Nt::Error>> {
        let Some(code) = self.engine.registry().get_tuning_code(channel, mode) else {
            return Ok(());
        };
        self.radio
            .set_frequency(channel, code)
            .map_err(DriverError::Radio)?;
        self.trace.trace_code(mode_direction(mode), channel, code);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use core::convert::Infallible;
    use tuning_core::TuningCode;

    #[derive(Default)]
    struct FakeRadio {
        frequency: Option<(u8, TuningCode)>,
    }

    impl Radio for FakeRadio {
        type Error = Infallible;

        fn rf_on(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn rf_off(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn set_frequency(&mut self, channel: u8, code: TuningCode) -> Result<(), Self::Error> {
            self.frequency = Some((channel, code));
            Ok(())
        }

        fn rx_enable(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn rx_now(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn tx_enable(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn tx_now(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn load_packet(&mut self, _buf: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }

        fn received_frame(
            &mut self,
            _buf: &mut [u8],
        ) -> Result<Option<crate::collaborator::ReceivedFrame>, Self::Error> {
            Ok(None)
        }
    }

    struct AlwaysNegotiated;

    impl Mac for AlwaysNegotiated {
        fn is_synched(&self) -> bool {
            true
        }

        fn has_negotiated_cell(&self, _neighbor: u16, _cell_type: CellType) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct FakeNamedTimer {
        next_id: u32,
        scheduled: Option<(u32, u32)>,
    }

    impl NamedTimer for FakeNamedTimer {
        type Error = Infallible;
        type Id = u32;

        fn create(&mut self) -> Result<Self::Id, Self::Error> {
            let id = self.next_id;
            self.next_id += 1;
            Ok(id)
        }

        fn schedule_absolute(&mut self, id: Self::Id, at_tick: u32) -> Result<(), Self::Error> {
            self.scheduled = Some((id, at_tick));
            Ok(())
        }

        fn cancel(&mut self, _id: Self::Id) -> Result<(), Self::Error> {
            self.scheduled = None;
            Ok(())
        }
    }

    fn engine_in_remaining_rx() -> ChannelCalEngine {
        use tuning_core::{SweepConfig, SweepRange};
        let cfg = SweepConfig::new(
            SweepRange::new(22, 22),
            SweepRange::new(15, 15),
            SweepRange::new(0, 31),
        );
        let mut engine = ChannelCalEngine::new(17, cfg).unwrap();
        engine.begin_initial_rx().unwrap();
        engine.frame_received(TuningCode::new(22, 15, 7)).unwrap();
        engine.complete_initial_rx().unwrap();
        engine
    }

    #[test]
    fn arm_channel_creates_timer_only_when_negotiated() {
        let mut driver = EventDrivenDriver::new(
            engine_in_remaining_rx(),
            FakeRadio::default(),
            AlwaysNegotiated,
            FakeNamedTimer::default(),
            crate::collaborator::NullTrace,
        );
        driver.arm_channel(18, ChannelMode::Rx, 1, 1_000).unwrap();
        assert_eq!(driver.timers.scheduled, Some((0, 1_000)));
    }

    #[test]
    fn repeated_timeouts_advance_and_retune() {
        let mut driver = EventDrivenDriver::new(
            engine_in_remaining_rx(),
            FakeRadio::default(),
            AlwaysNegotiated,
            FakeNamedTimer::default(),
            crate::collaborator::NullTrace,
        );
        let before = driver.engine().registry().get_tuning_code(18, ChannelMode::Rx).unwrap();
        driver.on_beacon_timeout(18, ChannelMode::Rx).unwrap();
        driver.on_beacon_timeout(18, ChannelMode::Rx).unwrap();
        let after = driver.engine().registry().get_tuning_code(18, ChannelMode::Rx).unwrap();
        assert_ne!(before, after);
        assert_eq!(driver.radio.frequency, Some((18, after)));
    }

    #[test]
    fn beacon_success_latches_calibrated_and_seeds_tx() {
        let mut driver = EventDrivenDriver::new(
            engine_in_remaining_rx(),
            FakeRadio::default(),
            AlwaysNegotiated,
            FakeNamedTimer::default(),
            crate::collaborator::NullTrace,
        );
        driver.on_beacon_success(18, ChannelMode::Rx, None).unwrap();
        assert!(driver.engine().registry().get(18).unwrap().rx.calibrated);
    }

    #[test]
    fn sustained_high_if_estimate_corrects_and_retunes() {
        use tuning_core::config::{IF_NOMINAL, MAX_IF_OFFSET, MIN_IF_ESTIMATES};

        let mut driver = EventDrivenDriver::new(
            engine_in_remaining_rx(),
            FakeRadio::default(),
            AlwaysNegotiated,
            FakeNamedTimer::default(),
            crate::collaborator::NullTrace,
        );
        driver.on_beacon_success(18, ChannelMode::Rx, None).unwrap();
        let before = driver.engine().registry().get_tuning_code(18, ChannelMode::Rx).unwrap();

        for _ in 0..MIN_IF_ESTIMATES {
            driver
                .on_beacon_success(18, ChannelMode::Rx, Some(IF_NOMINAL + MAX_IF_OFFSET + 1))
                .unwrap();
        }

        let after = driver.engine().registry().get_tuning_code(18, ChannelMode::Rx).unwrap();
        assert_eq!(after, before.decrement_fine(1).unwrap());
        assert_eq!(driver.radio.frequency, Some((18, after)));
    }
}
