//! Wire encoding for the fixed-length packets exchanged between mote and
//! peer: CRC, byte-at-a-time serialization, and the RX/TX packet layouts
//! themselves.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod averaging;
pub mod crc;
pub mod packet;
pub mod serialize;

pub use averaging::average_runs;
pub use crc::{CrcDigest, CrcStyle, CrcXModem};
pub use packet::{PacketError, RxCommand, RxPacket, TxPacket, MAX_TX_CODES_PER_CHANNEL};
pub use serialize::Serializer;
