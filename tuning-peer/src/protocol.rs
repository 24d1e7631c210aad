//! The base-station side of the two-step calibration handshake. Generic
//! over [`Transport`] so the state machine can be driven by a real serial
//! port or, in tests, by an in-memory fake -- mirroring how the bare-metal
//! driver is tested against fake collaborators instead of real hardware.

use std::time::Duration;

use tuning_core::config::{MAX_CHANNEL, MIN_CHANNEL, TX_ACK_TIMEOUT_MS};
use tuning_core::TuningCode;
use tuning_wire::{average_runs, CrcXModem, PacketError, RxCommand, RxPacket, TxPacket};

const CAL_START: u8 = MIN_CHANNEL;
const CAL_END: u8 = MAX_CHANNEL;

const RX_TIMEOUT_FIRST: Duration = Duration::from_millis(2_000);
const RX_TIMEOUT_REST: Duration = Duration::from_millis(500);
const TX_ACK_TIMEOUT: Duration = Duration::from_millis(TX_ACK_TIMEOUT_MS as u64);

/// What the coordinator is currently doing, reported to the caller between
/// channels so a CLI can drive a progress bar or print trace lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    RxAveraging,
    RxAck,
    SmartStakeRx,
}

pub trait Transport {
    fn send(&mut self, buf: &[u8]) -> anyhow::Result<()>;
    fn recv_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> anyhow::Result<usize>;
}

pub struct Coordinator<T> {
    transport: T,
    crc: CrcXModem,
    sequence_number: u8,
    state: PeerState,
}

impl<T: Transport> Coordinator<T> {
    pub fn new(transport: T) -> Self {
        Coordinator {
            transport,
            crc: CrcXModem::new(),
            sequence_number: 0,
            state: PeerState::RxAveraging,
        }
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    fn recv_rx_packet(&mut self, timeout: Duration) -> anyhow::Result<Option<RxPacket>> {
        let mut buf = [0u8; tuning_wire::packet::RX_PACKET_LEN];
        let n = self.transport.recv_timeout(&mut buf, timeout)?;
        if n < buf.len() {
            return Ok(None);
        }
        match RxPacket::parse(&self.crc, &buf) {
            Ok((_, pkt)) => Ok(Some(pkt)),
            Err(PacketError::CrcMismatch) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("malformed RX packet: {e:?}")),
        }
    }

    /// Step 1: listen on `channel` until the inter-packet timeout expires,
    /// averaging whatever codes SCuM reported.
    fn average_channel(&mut self, channel: u8) -> anyhow::Result<([TuningCode; 4], usize)> {
        use tuning_core::config::{MAX_RECORDED_TX_CODES, MID_CODE_THRESHOLD};

        let mut samples = Vec::with_capacity(MAX_RECORDED_TX_CODES);
        let mut timeout = RX_TIMEOUT_FIRST;

        loop {
            match self.recv_rx_packet(timeout)? {
                Some(pkt) if pkt.channel == channel => {
                    let near_rollover = pkt.tuning_code.mid >= MID_CODE_THRESHOLD;
                    if samples.len() == MAX_RECORDED_TX_CODES {
                        tracing::warn!(channel, "sample log full, dropping oldest entry");
                        samples.remove(0);
                    }
                    samples.push(pkt.tuning_code);
                    timeout = if near_rollover {
                        RX_TIMEOUT_FIRST
                    } else {
                        RX_TIMEOUT_REST
                    };
                }
                Some(_other_channel) => continue,
                None => break,
            }
        }

        Ok(average_runs(&samples))
    }

    /// Step 2: transmit the averaged codes for `channel`, waiting for a
    /// change-channel ACK from SCuM on the same channel.
    fn ack_channel(&mut self, channel: u8, codes: &[TuningCode]) -> anyhow::Result<()> {
        loop {
            let pkt = TxPacket::new(self.sequence_number, channel, codes);
            self.sequence_number = self.sequence_number.wrapping_add(1);
            let mut buf = [0u8; tuning_wire::packet::TX_PACKET_LEN];
            pkt.encode(&self.crc, &mut buf);
            self.transport.send(&buf)?;

            if let Some(ack) = self.recv_rx_packet(TX_ACK_TIMEOUT)? {
                if ack.command == RxCommand::ChangeChannel && ack.channel == channel {
                    return Ok(());
                }
            }
        }
    }

    /// Run the full calibration handshake to completion, calling
    /// `on_channel_done` after each channel finishes averaging so a caller
    /// can report progress.
    pub fn run(&mut self, mut on_channel_done: impl FnMut(u8, PeerState)) -> anyhow::Result<()> {
        use tuning_core::config::{MIN_CHANNEL, NUM_CHANNELS};

        self.state = PeerState::RxAveraging;
        let mut per_channel = [[TuningCode::new(0, 0, 0); 4]; NUM_CHANNELS];
        for channel in CAL_START..=CAL_END {
            let (codes, num_runs) = self.average_channel(channel)?;
            tracing::info!(channel, num_runs, "averaged channel");
            per_channel[(channel - MIN_CHANNEL) as usize] = codes;
            on_channel_done(channel, self.state);
        }

        self.state = PeerState::RxAck;
        for channel in CAL_START..=CAL_END {
            let codes = per_channel[(channel - MIN_CHANNEL) as usize];
            self.ack_channel(channel, &codes)?;
            tracing::info!(channel, "acked channel");
            on_channel_done(channel, self.state);
        }

        self.state = PeerState::SmartStakeRx;
        tracing::info!("entering smart-stake rx");
        Ok(())
    }
}
