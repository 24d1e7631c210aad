//! The hardware contracts the calibration engine is driven through: a radio
//! that can be tuned and polled for frames, a one-shot timer, a MAC layer
//! queried only for synchronization state, and a UART-backed trace sink.
//! None of them are implemented here; a board crate provides the impls.

use fugit::MillisDurationU32;
use tuning_core::TuningCode;

/// Which direction a trace line describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Rx,
    Tx,
}

/// A frame handed back by [`Radio::received_frame`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReceivedFrame {
    pub len: usize,
    pub rssi: i8,
    pub lqi: u8,
    pub crc_ok: bool,
}

/// The radio peripheral: tuning, RX/TX control, and packet buffer access.
///
/// `received_frame` is polled from the main loop after an end-frame ISR has
/// set a flag; it is not itself called from interrupt context.
pub trait Radio {
    type Error;

    fn rf_on(&mut self) -> Result<(), Self::Error>;
    fn rf_off(&mut self) -> Result<(), Self::Error>;

    /// Tune to `code` for `channel`. Does not itself enable RX or TX.
    fn set_frequency(&mut self, channel: u8, code: TuningCode) -> Result<(), Self::Error>;

    fn rx_enable(&mut self) -> Result<(), Self::Error>;
    fn rx_now(&mut self) -> Result<(), Self::Error>;

    fn tx_enable(&mut self) -> Result<(), Self::Error>;
    fn tx_now(&mut self) -> Result<(), Self::Error>;

    fn load_packet(&mut self, buf: &[u8]) -> Result<(), Self::Error>;

    /// Copy the most recently received frame into `buf`, if one is pending.
    fn received_frame(&mut self, buf: &mut [u8]) -> Result<Option<ReceivedFrame>, Self::Error>;
}

/// A one-shot, re-armable timer, for the bare-metal driver: a single
/// registered callback, armed and cancelled by the caller.
pub trait Timer {
    type Error;

    fn read_counter(&mut self) -> u32;
    fn arm(&mut self, timeout: MillisDurationU32) -> Result<(), Self::Error>;
    fn cancel(&mut self) -> Result<(), Self::Error>;
}

/// Multiple named one-shot timers, for the MAC-integrated variant where
/// several independent timeouts (RX listen, TX ack, MAC housekeeping) can be
/// live at once. [`BareMetalDriver`](crate::driver::BareMetalDriver) only
/// ever needs [`Timer`]; this is the richer surface a MAC-aware driver would
/// be built against.
pub trait NamedTimer {
    type Error;
    type Id: Copy + Eq;

    fn create(&mut self) -> Result<Self::Id, Self::Error>;
    fn schedule_absolute(&mut self, id: Self::Id, at_tick: u32) -> Result<(), Self::Error>;
    fn cancel(&mut self, id: Self::Id) -> Result<(), Self::Error>;
}

/// A negotiated-cell cell type, as queried from the MAC layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CellType {
    Tx,
    Rx,
}

/// The MAC-integrated variant's view into slotframe scheduling. Bare-metal
/// boards can use [`NullMac`] below.
pub trait Mac {
    fn is_synched(&self) -> bool;
    fn has_negotiated_cell(&self, neighbor: u16, cell_type: CellType) -> bool;
}

/// A [`Mac`] for boards with no MAC layer: never synched, no negotiated
/// cells. The bare-metal driver never calls into it, but it lets the same
/// orchestrator type be instantiated either way.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMac;

impl Mac for NullMac {
    fn is_synched(&self) -> bool {
        false
    }

    fn has_negotiated_cell(&self, _neighbor: u16, _cell_type: CellType) -> bool {
        false
    }
}

/// Diagnostic trace sink, with two UART line formats: a new format carrying
/// the channel and `(coarse, mid, fine)` code, and a legacy format carrying
/// the channel and three plain numeric fields.
pub trait Trace {
    fn trace_code(&mut self, dir: Direction, channel: u8, code: TuningCode);
    fn trace_legacy(&mut self, dir: Direction, channel: u8, code: TuningCode);
}

/// A [`Trace`] that discards everything, for boards or tests with no UART.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrace;

impl Trace for NullTrace {
    fn trace_code(&mut self, _dir: Direction, _channel: u8, _code: TuningCode) {}
    fn trace_legacy(&mut self, _dir: Direction, _channel: u8, _code: TuningCode) {}
}
