//! A host-runnable stand-in board, used by `cargo run` and by this crate's
//! own integration test. It has no real radio or timer: the demo script
//! below drives the calibration engine by hand, the way a peer's timer
//! ISR and end-frame ISR would in firmware.

use tuning_core::config::{IF_NOMINAL, MAX_CHANNEL, MAX_IF_OFFSET, MIN_CHANNEL, MIN_IF_ESTIMATES};
use tuning_core::registry::ChannelMode;
use tuning_core::{ChannelCalEngine, SweepConfig, SweepRange, TuningCode};
use tuning_hal::{
    BareMetalDriver, CellType, EventDrivenDriver, Mac, NamedTimer, Radio, ReceivedFrame, Timer,
};
use tuning_wire::{CrcXModem, RxCommand, RxPacket};

#[derive(Default)]
pub struct SimRadio {
    pub last_frequency: Option<(u8, TuningCode)>,
    pub rx_enabled: bool,
}

impl Radio for SimRadio {
    type Error = core::convert::Infallible;

    fn rf_on(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn rf_off(&mut self) -> Result<(), Self::Error> {
        self.rx_enabled = false;
        Ok(())
    }

    fn set_frequency(&mut self, channel: u8, code: TuningCode) -> Result<(), Self::Error> {
        self.last_frequency = Some((channel, code));
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

    fn received_frame(&mut self, _buf: &mut [u8]) -> Result<Option<ReceivedFrame>, Self::Error> {
        Ok(None)
    }
}

#[derive(Default)]
pub struct SimTimer {
    pub armed: Option<fugit::MillisDurationU32>,
}

impl Timer for SimTimer {
    type Error = core::convert::Infallible;

    fn read_counter(&mut self) -> u32 {
        0
    }

    fn arm(&mut self, timeout: fugit::MillisDurationU32) -> Result<(), Self::Error> {
        self.armed = Some(timeout);
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        self.armed = None;
        Ok(())
    }
}

/// A MAC that has synched and negotiated a cell with every neighbor it's
/// asked about, for driving the event-driven steady-state tail in the demo.
#[derive(Default)]
pub struct SimMac;

impl Mac for SimMac {
    fn is_synched(&self) -> bool {
        true
    }

    fn has_negotiated_cell(&self, _neighbor: u16, _cell_type: CellType) -> bool {
        true
    }
}

#[derive(Default)]
pub struct SimNamedTimer {
    pub next_id: u32,
}

impl NamedTimer for SimNamedTimer {
    type Error = core::convert::Infallible;
    type Id = u32;

    fn create(&mut self) -> Result<Self::Id, Self::Error> {
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    fn schedule_absolute(&mut self, _id: Self::Id, _at_tick: u32) -> Result<(), Self::Error> {
        Ok(())
    }

    fn cancel(&mut self, _id: Self::Id) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct StdoutSink;

impl core::fmt::Write for StdoutSink {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        print!("{s}");
        Ok(())
    }
}

pub type SimDriver = BareMetalDriver<SimRadio, SimTimer, crate::trace::LineTrace<StdoutSink>, CrcXModem>;

fn demo_sweep() -> SweepConfig {
    SweepConfig::new(
        SweepRange::new(22, 22),
        SweepRange::new(15, 15),
        SweepRange::new(0, 31),
    )
}

/// Run the initial sweep to completion against a peer that answers on the
/// 3rd timer tick, printing trace lines as it goes, and report the final
/// registry state on stdout.
pub fn run_demo() {
    let engine = ChannelCalEngine::new(17, demo_sweep()).expect("valid sweep config");
    let mut driver: SimDriver = BareMetalDriver::new(
        engine,
        SimRadio::default(),
        SimTimer::default(),
        crate::trace::LineTrace::new(StdoutSink),
        CrcXModem::new(),
    );

    driver.start().expect("radio/timer never fail in sim");
    for _ in 0..2 {
        driver.on_timer_fired().expect("radio/timer never fail in sim");
    }

    let pkt = RxPacket {
        sequence_number: 0,
        channel: 17,
        command: RxCommand::None,
        tuning_code: TuningCode::new(22, 15, 3),
    };
    let mut buf = [0u8; tuning_wire::packet::RX_PACKET_LEN];
    pkt.encode(&CrcXModem::new(), &mut buf);
    driver.on_frame_received(&buf).expect("packet round-trips");
    driver.finish_initial_rx().expect("calibration succeeds");

    println!("calibration state: {:?}", driver.engine().state());
    println!(
        "channel 17 rx: {:?}",
        driver.engine().registry().get_tuning_code(17, tuning_core::ChannelMode::Rx)
    );

    run_steady_state_demo(driver.into_engine());
}

/// Continue past the initial sweep into the MAC-integrated event-driven
/// tail: every channel's EB exchange succeeds once, promoting the engine
/// through `TxCal` into `Feedback`, then two scenarios play out on top of
/// that steady state: a channel that drops a couple of beacons before the
/// next one lands, and a channel whose IF estimate runs consistently high
/// until feedback corrects it.
fn run_steady_state_demo(engine: ChannelCalEngine) {
    let mut driver = EventDrivenDriver::new(
        engine,
        SimRadio::default(),
        SimMac,
        SimNamedTimer::default(),
        crate::trace::LineTrace::new(StdoutSink),
    );

    for channel in MIN_CHANNEL..=MAX_CHANNEL {
        driver
            .on_beacon_success(channel, ChannelMode::Rx, None)
            .expect("mac events never fail in sim");
    }
    driver.engine_mut().begin_tx_cal().expect("every rx channel calibrated");
    for channel in MIN_CHANNEL..=MAX_CHANNEL {
        driver
            .on_beacon_success(channel, ChannelMode::Tx, None)
            .expect("mac events never fail in sim");
    }
    driver.engine_mut().begin_feedback().expect("every tx channel calibrated");
    println!("steady-state calibration state: {:?}", driver.engine().state());

    driver
        .on_beacon_timeout(20, ChannelMode::Rx)
        .expect("mac events never fail in sim");
    driver
        .on_beacon_timeout(20, ChannelMode::Rx)
        .expect("mac events never fail in sim");
    println!(
        "channel 20 rx after two dropped beacons: {:?}",
        driver.engine().registry().get_tuning_code(20, ChannelMode::Rx)
    );

    let before = driver.engine().registry().get_tuning_code(21, ChannelMode::Rx);
    for _ in 0..MIN_IF_ESTIMATES {
        driver
            .on_beacon_success(21, ChannelMode::Rx, Some(IF_NOMINAL + MAX_IF_OFFSET + 1))
            .expect("mac events never fail in sim");
    }
    println!(
        "channel 21 rx corrected by feedback: {:?} -> {:?}",
        before,
        driver.engine().registry().get_tuning_code(21, ChannelMode::Rx)
    );
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn demo_reaches_remaining_rx() {
        let engine = ChannelCalEngine::new(17, demo_sweep()).unwrap();
        let mut driver: SimDriver = BareMetalDriver::new(
            engine,
            SimRadio::default(),
            SimTimer::default(),
            crate::trace::LineTrace::new(StdoutSink),
            CrcXModem::new(),
        );
        driver.start().unwrap();
        for _ in 0..2 {
            driver.on_timer_fired().unwrap();
        }
        let pkt = RxPacket {
            sequence_number: 0,
            channel: 17,
            command: RxCommand::None,
            tuning_code: TuningCode::new(22, 15, 3),
        };
        let mut buf = [0u8; tuning_wire::packet::RX_PACKET_LEN];
        pkt.encode(&CrcXModem::new(), &mut buf);
        driver.on_frame_received(&buf).unwrap();
        driver.finish_initial_rx().unwrap();

        assert_eq!(
            driver.engine().state(),
            tuning_core::calibration::State::RemainingRx
        );
    }

    #[test]
    fn steady_state_tail_reaches_feedback_and_corrects() {
        let engine = ChannelCalEngine::new(17, demo_sweep()).unwrap();
        let mut driver: SimDriver = BareMetalDriver::new(
            engine,
            SimRadio::default(),
            SimTimer::default(),
            crate::trace::LineTrace::new(StdoutSink),
            CrcXModem::new(),
        );
        driver.start().unwrap();
        for _ in 0..2 {
            driver.on_timer_fired().unwrap();
        }
        let pkt = RxPacket {
            sequence_number: 0,
            channel: 17,
            command: RxCommand::None,
            tuning_code: TuningCode::new(22, 15, 3),
        };
        let mut buf = [0u8; tuning_wire::packet::RX_PACKET_LEN];
        pkt.encode(&CrcXModem::new(), &mut buf);
        driver.on_frame_received(&buf).unwrap();
        driver.finish_initial_rx().unwrap();

        let mut ev_driver = EventDrivenDriver::new(
            driver.into_engine(),
            SimRadio::default(),
            SimMac,
            SimNamedTimer::default(),
            crate::trace::LineTrace::new(StdoutSink),
        );
        for channel in MIN_CHANNEL..=MAX_CHANNEL {
            ev_driver.on_beacon_success(channel, ChannelMode::Rx, None).unwrap();
        }
        ev_driver.engine_mut().begin_tx_cal().unwrap();
        for channel in MIN_CHANNEL..=MAX_CHANNEL {
            ev_driver.on_beacon_success(channel, ChannelMode::Tx, None).unwrap();
        }
        ev_driver.engine_mut().begin_feedback().unwrap();
        assert_eq!(
            ev_driver.engine().state(),
            tuning_core::calibration::State::Feedback
        );

        let before = ev_driver.engine().registry().get_tuning_code(21, ChannelMode::Rx).unwrap();
        for _ in 0..MIN_IF_ESTIMATES {
            ev_driver
                .on_beacon_success(21, ChannelMode::Rx, Some(IF_NOMINAL + MAX_IF_OFFSET + 1))
                .unwrap();
        }
        let after = ev_driver.engine().registry().get_tuning_code(21, ChannelMode::Rx).unwrap();
        assert_eq!(after, before.decrement_fine(1).unwrap());
    }
}
