//! Per-`(channel, mode)` tuning-code storage.

use crate::algebra::TuningCode;
use crate::config::{MAX_CHANNEL, MIN_CHANNEL, NUM_CHANNELS};
use crate::sweep::SweepConfig;

/// Which direction a tuning code applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelMode {
    Rx,
    Tx,
}

/// Calibration state for one `(channel, mode)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelModeInfo {
    pub tuning_code: TuningCode,
    pub sweep_config: SweepConfig,
    pub num_failures: u8,
    pub calibrated: bool,
}

impl ChannelModeInfo {
    pub fn new(tuning_code: TuningCode, sweep_config: SweepConfig) -> Self {
        ChannelModeInfo {
            tuning_code,
            sweep_config,
            num_failures: 0,
            calibrated: false,
        }
    }
}

/// RX and TX calibration state for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelInfo {
    pub rx: ChannelModeInfo,
    pub tx: ChannelModeInfo,
}

/// Map an 802.15.4 channel number to a registry index.
pub fn channel_to_index(channel: u8) -> Option<usize> {
    if (MIN_CHANNEL..=MAX_CHANNEL).contains(&channel) {
        Some((channel - MIN_CHANNEL) as usize)
    } else {
        None
    }
}

/// Fixed-size table of per-channel tuning state.
///
/// This is the single owner of the authoritative tuning codes; the
/// calibration engine and feedback controller both borrow it mutably, but
/// never concurrently for the same channel and mode.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    channels: [ChannelInfo; NUM_CHANNELS],
}

impl ChannelRegistry {
    pub fn new(initial: ChannelInfo) -> Self {
        ChannelRegistry {
            channels: [initial; NUM_CHANNELS],
        }
    }

    pub fn get(&self, channel: u8) -> Option<&ChannelInfo> {
        channel_to_index(channel).map(|i| &self.channels[i])
    }

    pub fn get_mut(&mut self, channel: u8) -> Option<&mut ChannelInfo> {
        channel_to_index(channel).map(|i| &mut self.channels[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &ChannelInfo)> {
        self.channels
            .iter()
            .enumerate()
            .map(|(i, info)| (MIN_CHANNEL + i as u8, info))
    }

    /// Store a tuning code for `(channel, mode)`. A no-op on unknown channels.
    pub fn set_tuning_code(&mut self, channel: u8, mode: ChannelMode, code: TuningCode) {
        let Some(info) = self.get_mut(channel) else {
            return;
        };
        match mode {
            ChannelMode::Rx => info.rx.tuning_code = code,
            ChannelMode::Tx => info.tx.tuning_code = code,
        }
    }

    /// Fetch the tuning code for `(channel, mode)`.
    pub fn get_tuning_code(&self, channel: u8, mode: ChannelMode) -> Option<TuningCode> {
        let info = self.get(channel)?;
        Some(match mode {
            ChannelMode::Rx => info.rx.tuning_code,
            ChannelMode::Tx => info.tx.tuning_code,
        })
    }

    pub fn all_rx_calibrated(&self) -> bool {
        self.channels.iter().all(|c| c.rx.calibrated)
    }

    pub fn all_tx_calibrated(&self) -> bool {
        self.channels.iter().all(|c| c.tx.calibrated)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sweep::SweepRange;

    fn default_mode_info() -> ChannelModeInfo {
        ChannelModeInfo::new(
            TuningCode::new(0, 0, 0),
            SweepConfig::new(
                SweepRange::new(0, 31),
                SweepRange::new(0, 31),
                SweepRange::new(0, 31),
            ),
        )
    }

    #[test]
    fn channel_to_index_bounds() {
        assert_eq!(channel_to_index(MIN_CHANNEL), Some(0));
        assert_eq!(channel_to_index(MAX_CHANNEL), Some(NUM_CHANNELS - 1));
        assert_eq!(channel_to_index(MIN_CHANNEL - 1), None);
        assert_eq!(channel_to_index(MAX_CHANNEL + 1), None);
    }

    #[test]
    fn set_get_tuning_code_roundtrip() {
        let mut reg = ChannelRegistry::new(ChannelInfo {
            rx: default_mode_info(),
            tx: default_mode_info(),
        });
        let code = TuningCode::new(20, 15, 10);
        reg.set_tuning_code(17, ChannelMode::Rx, code);
        assert_eq!(reg.get_tuning_code(17, ChannelMode::Rx), Some(code));
        assert_ne!(reg.get_tuning_code(17, ChannelMode::Tx), Some(code));
    }

    #[test]
    fn unknown_channel_is_noop() {
        let mut reg = ChannelRegistry::new(ChannelInfo {
            rx: default_mode_info(),
            tx: default_mode_info(),
        });
        reg.set_tuning_code(99, ChannelMode::Rx, TuningCode::new(1, 1, 1));
        assert_eq!(reg.get_tuning_code(99, ChannelMode::Rx), None);
    }

    #[test]
    fn all_calibrated_tracks_every_channel() {
        let mut reg = ChannelRegistry::new(ChannelInfo {
            rx: default_mode_info(),
            tx: default_mode_info(),
        });
        assert!(!reg.all_rx_calibrated());
        for c in MIN_CHANNEL..=MAX_CHANNEL {
            reg.get_mut(c).unwrap().rx.calibrated = true;
        }
        assert!(reg.all_rx_calibrated());
        assert!(!reg.all_tx_calibrated());
    }
}
