//! Bridges the hardware-free calibration engine to real collaborators.
//!
//! This is the bare-metal variant: no MAC, one initial channel, a single RX
//! timer. The main loop calls [`BareMetalDriver`]'s methods in response to
//! ISR-set flags; nothing here runs in interrupt context itself.

use fugit::MillisDurationU32;

use tuning_core::calibration::{CalibrationError, ChannelCalEngine, State};
use tuning_core::config::{RX_TIMEOUT_LONG_MS, RX_TIMEOUT_SHORT_MS};
use tuning_core::TuningCode;
use tuning_wire::{CrcStyle, PacketError, RxPacket};

use crate::collaborator::{Direction, Radio, Timer, Trace};

#[derive(Debug)]
pub enum DriverError<RE: core::fmt::Debug, TE: core::fmt::Debug> {
    Radio(RE),
    Timer(TE),
    Calibration(CalibrationError),
    Packet(PacketError),
}

/// Owns the calibration engine plus the collaborators it is driven through.
pub struct BareMetalDriver<R, T, Tr, C> {
    engine: ChannelCalEngine,
    radio: R,
    timer: T,
    trace: Tr,
    crc: C,
}

impl<R, T, Tr, C> BareMetalDriver<R, T, Tr, C>
where
    R: Radio,
    T: Timer,
    Tr: Trace,
    C: CrcStyle,
    R::Error: core::fmt::Debug,
    T::Error: core::fmt::Debug,
{
    pub fn new(engine: ChannelCalEngine, radio: R, timer: T, trace: Tr, crc: C) -> Self {
        BareMetalDriver {
            engine,
            radio,
            timer,
            trace,
            crc,
        }
    }

    pub fn engine(&self) -> &ChannelCalEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ChannelCalEngine {
        &mut self.engine
    }

    /// Hand the calibration engine off, once phase 1/2 have reached
    /// `RemainingRx`, to a [`crate::mac_driver::EventDrivenDriver`] for the
    /// event-driven steady-state tail.
    pub fn into_engine(self) -> ChannelCalEngine {
        self.engine
    }

    fn timeout(&self) -> MillisDurationU32 {
        if self.engine.next_timeout_is_long() {
            MillisDurationU32::millis(RX_TIMEOUT_LONG_MS)
        } else {
            MillisDurationU32::millis(RX_TIMEOUT_SHORT_MS)
        }
    }

    fn tune_and_listen(&mut self, code: TuningCode) -> Result<(), DriverError<R::Error, T::Error>> {
        let channel = self.engine.initial_channel();
        self.radio
            .set_frequency(channel, code)
            .map_err(DriverError::Radio)?;
        self.radio.rx_enable().map_err(DriverError::Radio)?;
        self.radio.rx_now().map_err(DriverError::Radio)?;
        self.timer.arm(self.timeout()).map_err(DriverError::Timer)?;
        self.trace.trace_code(Direction::Rx, channel, code);
        Ok(())
    }

    /// Enter the initial sweep: tune to the first code and arm the timer.
    pub fn start(&mut self) -> Result<(), DriverError<R::Error, T::Error>> {
        let code = self
            .engine
            .begin_initial_rx()
            .map_err(DriverError::Calibration)?;
        self.tune_and_listen(code)
    }

    /// The RX listen timer fired with nothing received.
    pub fn on_timer_fired(&mut self) -> Result<(), DriverError<R::Error, T::Error>> {
        if self.engine.state() != State::InitialRxIdle {
            return Ok(());
        }
        self.radio.rf_off().map_err(DriverError::Radio)?;
        let code = self
            .engine
            .timer_expired()
            .map_err(DriverError::Calibration)?;
        self.tune_and_listen(code)
    }

    /// An end-frame ISR fired; `raw` is the packet buffer snapshotted at
    /// that time. Only meaningful while idling in `INITIAL_RX_IDLE`.
    pub fn on_frame_received(&mut self, raw: &[u8]) -> Result<(), DriverError<R::Error, T::Error>> {
        if self.engine.state() != State::InitialRxIdle {
            return Ok(());
        }
        let (_, pkt) = RxPacket::parse(&self.crc, raw).map_err(DriverError::Packet)?;
        self.timer.cancel().map_err(DriverError::Timer)?;
        self.engine
            .frame_received(pkt.tuning_code)
            .map_err(DriverError::Calibration)?;
        Ok(())
    }

    /// Main-loop side of `INITIAL_RX_RECEIVED`: latch the discovered code
    /// and run the per-channel extrapolation.
    pub fn finish_initial_rx(&mut self) -> Result<(), DriverError<R::Error, T::Error>> {
        self.engine
            .complete_initial_rx()
            .map_err(DriverError::Calibration)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::collaborator::{NullTrace, ReceivedFrame};
    use tuning_core::SweepConfig;
    use tuning_wire::CrcXModem;

    #[derive(Default)]
    struct FakeRadio {
        frequency: Option<(u8, TuningCode)>,
        rx_enabled: bool,
    }

    impl Radio for FakeRadio {
        type Error = core::convert::Infallible;

        fn rf_on(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn rf_off(&mut self) -> Result<(), Self::Error> {
            self.rx_enabled = false;
            Ok(())
        }

        fn set_frequency(&mut self, channel: u8, code: TuningCode) -> Result<(), Self::Error> {
            self.frequency = Some((channel, code));
            Ok(())
        }

        fn rx_enable(&mut self) -> Result<(), Self::Error> {
            self.rx_enabled = true;
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
        ) -> Result<Option<ReceivedFrame>, Self::Error> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct FakeTimer {
        armed: Option<MillisDurationU32>,
    }

    impl Timer for FakeTimer {
        type Error = core::convert::Infallible;

        fn read_counter(&mut self) -> u32 {
            0
        }

        fn arm(&mut self, timeout: MillisDurationU32) -> Result<(), Self::Error> {
            self.armed = Some(timeout);
            Ok(())
        }

        fn cancel(&mut self) -> Result<(), Self::Error> {
            self.armed = None;
            Ok(())
        }
    }

    fn test_sweep() -> SweepConfig {
        use tuning_core::SweepRange;
        SweepConfig::new(
            SweepRange::new(22, 22),
            SweepRange::new(15, 15),
            SweepRange::new(0, 31),
        )
    }

    #[test]
    fn start_tunes_and_arms_short_timeout() {
        let engine = ChannelCalEngine::new(17, test_sweep()).unwrap();
        let mut driver = BareMetalDriver::new(
            engine,
            FakeRadio::default(),
            FakeTimer::default(),
            NullTrace,
            CrcXModem::new(),
        );
        driver.start().unwrap();
        assert_eq!(driver.radio.frequency, Some((17, TuningCode::new(22, 15, 0))));
        assert!(driver.radio.rx_enabled);
        assert_eq!(driver.timer.armed, Some(MillisDurationU32::millis(RX_TIMEOUT_SHORT_MS)));
    }

    #[test]
    fn timer_fire_advances_fine_code() {
        let engine = ChannelCalEngine::new(17, test_sweep()).unwrap();
        let mut driver = BareMetalDriver::new(
            engine,
            FakeRadio::default(),
            FakeTimer::default(),
            NullTrace,
            CrcXModem::new(),
        );
        driver.start().unwrap();
        driver.on_timer_fired().unwrap();
        assert_eq!(driver.radio.frequency, Some((17, TuningCode::new(22, 15, 1))));
    }

    #[test]
    fn frame_then_finish_reaches_remaining_rx() {
        use tuning_wire::RxCommand;

        let engine = ChannelCalEngine::new(17, test_sweep()).unwrap();
        let crc = CrcXModem::new();
        let mut driver = BareMetalDriver::new(
            engine,
            FakeRadio::default(),
            FakeTimer::default(),
            NullTrace,
            crc,
        );
        driver.start().unwrap();

        let pkt = RxPacket {
            sequence_number: 0,
            channel: 17,
            command: RxCommand::None,
            tuning_code: TuningCode::new(22, 15, 3),
        };
        let mut buf = [0u8; tuning_wire::packet::RX_PACKET_LEN];
        let crc2 = CrcXModem::new();
        pkt.encode(&crc2, &mut buf);

        driver.on_frame_received(&buf).unwrap();
        assert_eq!(driver.engine().state(), State::InitialRxReceived);

        driver.finish_initial_rx().unwrap();
        assert_eq!(driver.engine().state(), State::RemainingRx);
        assert_eq!(
            driver.engine().registry().get_tuning_code(17, tuning_core::ChannelMode::Rx),
            Some(TuningCode::new(22, 15, 3))
        );
    }
}
