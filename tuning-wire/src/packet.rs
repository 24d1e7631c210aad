//! Fixed-length RX and TX packets exchanged between the mote and the peer
//! base station.
//!
//! Both packets are packed, little-endian, with a trailing CRC over every
//! byte that precedes it. There is no start/end marker and no obfuscation:
//! the link layer below this already frames packets, so these structs are
//! the payload.

use nom::bytes::complete::take;
use nom::number::complete::{le_u16, le_u8};
use nom::IResult;

use tuning_core::TuningCode;

use crate::crc::{CrcDigest, CrcStyle};
use crate::serialize::Serializer;

/// `command` field of an [`RxPacket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxCommand {
    None,
    ChangeChannel,
}

impl RxCommand {
    const NONE: u8 = 0x00;
    const CHANGE_CHANNEL: u8 = 0xFF;

    fn to_byte(self) -> u8 {
        match self {
            RxCommand::None => Self::NONE,
            RxCommand::ChangeChannel => Self::CHANGE_CHANNEL,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            Self::NONE => Some(RxCommand::None),
            Self::CHANGE_CHANNEL => Some(RxCommand::ChangeChannel),
            _ => None,
        }
    }
}

/// A packet reported by the mote: one tuning code, the channel it was
/// received on, and an optional command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxPacket {
    pub sequence_number: u8,
    pub channel: u8,
    pub command: RxCommand,
    pub tuning_code: TuningCode,
}

/// Wire length of [`RxPacket`], including its trailing CRC.
pub const RX_PACKET_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    Truncated,
    UnknownCommand(u8),
    CrcMismatch,
}

impl RxPacket {
    pub fn write<S: Serializer>(&self, ser: &mut S) -> Result<(), S::Error> {
        ser.write_u8(self.sequence_number)?;
        ser.write_u8(self.channel)?;
        ser.write_bytes(&[0, 0])?; // reserved
        ser.write_u8(self.command.to_byte())?;
        ser.write_u8(0)?; // reserved
        ser.write_u8(self.tuning_code.coarse)?;
        ser.write_u8(self.tuning_code.mid)?;
        ser.write_u8(self.tuning_code.fine)?;
        ser.write_u8(0) // reserved
    }

    /// Serialize into `buf`, computing and appending the CRC, and return the
    /// number of bytes written (always [`RX_PACKET_LEN`]).
    pub fn encode<C: CrcStyle>(&self, crc: &C, buf: &mut [u8; RX_PACKET_LEN]) -> usize {
        let mut ser = crate::serialize::SerializerBuf::new(&mut buf[..RX_PACKET_LEN - 2]);
        self.write(&mut ser).expect("buffer sized for RxPacket");
        let body_len = ser.position();
        let mut digest = crc.digest();
        digest.update(&buf[..body_len]);
        let crc_val = digest.finalize();
        buf[body_len] = (crc_val & 0xff) as u8;
        buf[body_len + 1] = (crc_val >> 8) as u8;
        RX_PACKET_LEN
    }

    pub fn parse<'a, C: CrcStyle>(crc: &C, input: &'a [u8]) -> Result<(&'a [u8], Self), PacketError> {
        if input.len() < RX_PACKET_LEN {
            return Err(PacketError::Truncated);
        }
        let body = &input[..RX_PACKET_LEN - 2];

        let parse_body = |i: &'a [u8]| -> IResult<&'a [u8], (u8, u8, u8, u8, u8, u8)> {
            let (i, sequence_number) = le_u8(i)?;
            let (i, channel) = le_u8(i)?;
            let (i, _reserved) = take(2usize)(i)?;
            let (i, command) = le_u8(i)?;
            let (i, _reserved) = take(1usize)(i)?;
            let (i, coarse) = le_u8(i)?;
            let (i, mid) = le_u8(i)?;
            let (i, fine) = le_u8(i)?;
            let (i, _reserved) = take(1usize)(i)?;
            Ok((i, (sequence_number, channel, command, coarse, mid, fine)))
        };

        let (_, (sequence_number, channel, command, coarse, mid, fine)) =
            parse_body(body).map_err(|_: nom::Err<nom::error::Error<_>>| PacketError::Truncated)?;

        let (rest, provided_crc) =
            le_u16::<_, nom::error::Error<&[u8]>>(&input[RX_PACKET_LEN - 2..])
                .map_err(|_| PacketError::Truncated)?;

        let mut digest = crc.digest();
        digest.update(body);
        let calculated = digest.finalize();
        if !crc.validate(calculated, provided_crc) {
            return Err(PacketError::CrcMismatch);
        }

        let command =
            RxCommand::from_byte(command).ok_or(PacketError::UnknownCommand(command))?;

        Ok((
            rest,
            RxPacket {
                sequence_number,
                channel,
                command,
                tuning_code: TuningCode::new(coarse, mid, fine),
            },
        ))
    }
}

/// Maximum number of averaged tuning codes carried in one [`TxPacket`].
pub const MAX_TX_CODES_PER_CHANNEL: usize = 4;

/// Wire length of [`TxPacket`], including its trailing CRC.
pub const TX_PACKET_LEN: usize = 19;

/// A batch of averaged tuning codes sent by the peer for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxPacket {
    pub sequence_number: u8,
    pub channel: u8,
    /// Slots beyond `num_codes` are unused padding (all-zero code).
    pub codes: [TuningCode; MAX_TX_CODES_PER_CHANNEL],
    pub num_codes: u8,
}

impl TxPacket {
    pub fn new(sequence_number: u8, channel: u8, codes: &[TuningCode]) -> Self {
        let num_codes = codes.len().min(MAX_TX_CODES_PER_CHANNEL) as u8;
        let mut slots = [TuningCode::new(0, 0, 0); MAX_TX_CODES_PER_CHANNEL];
        for (slot, code) in slots.iter_mut().zip(codes.iter()) {
            *slot = *code;
        }
        TxPacket {
            sequence_number,
            channel,
            codes: slots,
            num_codes,
        }
    }

    pub fn codes(&self) -> &[TuningCode] {
        &self.codes[..self.num_codes as usize]
    }

    pub fn write<S: Serializer>(&self, ser: &mut S) -> Result<(), S::Error> {
        ser.write_u8(self.sequence_number)?;
        ser.write_u8(self.channel)?;
        for code in self.codes.iter() {
            ser.write_u8(code.coarse)?;
            ser.write_u8(code.mid)?;
            ser.write_u8(code.fine)?;
        }
        ser.write_u8(0)?; // reserved pad byte (offset 14)
        ser.write_bytes(&[0, 0]) // reserved
    }

    pub fn encode<C: CrcStyle>(&self, crc: &C, buf: &mut [u8; TX_PACKET_LEN]) -> usize {
        let mut ser = crate::serialize::SerializerBuf::new(&mut buf[..TX_PACKET_LEN - 2]);
        self.write(&mut ser).expect("buffer sized for TxPacket");
        let body_len = ser.position();
        let mut digest = crc.digest();
        digest.update(&buf[..body_len]);
        let crc_val = digest.finalize();
        buf[body_len] = (crc_val & 0xff) as u8;
        buf[body_len + 1] = (crc_val >> 8) as u8;
        TX_PACKET_LEN
    }

    pub fn parse<'a, C: CrcStyle>(crc: &C, input: &'a [u8]) -> Result<(&'a [u8], Self), PacketError> {
        if input.len() < TX_PACKET_LEN {
            return Err(PacketError::Truncated);
        }
        let body = &input[..TX_PACKET_LEN - 2];

        let parse_body = |i: &'a [u8]| -> IResult<&'a [u8], (u8, u8, [TuningCode; MAX_TX_CODES_PER_CHANNEL])> {
            let (i, sequence_number) = le_u8(i)?;
            let (i, channel) = le_u8(i)?;
            let mut codes = [TuningCode::new(0, 0, 0); MAX_TX_CODES_PER_CHANNEL];
            let mut rest = i;
            for code in codes.iter_mut() {
                let (next, coarse) = le_u8(rest)?;
                let (next, mid) = le_u8(next)?;
                let (next, fine) = le_u8(next)?;
                *code = TuningCode::new(coarse, mid, fine);
                rest = next;
            }
            let (rest, _reserved) = take(1usize)(rest)?;
            Ok((rest, (sequence_number, channel, codes)))
        };

        let (_, (sequence_number, channel, codes)) = parse_body(body)
            .map_err(|_: nom::Err<nom::error::Error<_>>| PacketError::Truncated)?;

        let (rest, provided_crc) =
            le_u16::<_, nom::error::Error<&[u8]>>(&input[TX_PACKET_LEN - 2..])
                .map_err(|_| PacketError::Truncated)?;

        let mut digest = crc.digest();
        digest.update(body);
        let calculated = digest.finalize();
        if !crc.validate(calculated, provided_crc) {
            return Err(PacketError::CrcMismatch);
        }

        let zero = TuningCode::new(0, 0, 0);
        let num_codes = codes.iter().take_while(|c| **c != zero).count() as u8;

        Ok((
            rest,
            TxPacket {
                sequence_number,
                channel,
                codes,
                num_codes,
            },
        ))
    }
}
