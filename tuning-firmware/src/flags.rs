//! The ISR/main-loop flag word.
//!
//! ISRs only ever set bits here (a single word-sized atomic write); the
//! main loop takes and clears the whole word at once. No critical section
//! is needed for this on single-core targets.

use portable_atomic::{AtomicU32, Ordering};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Flags: u32 {
        const TIMER_FIRED    = 1 << 0;
        const FRAME_RECEIVED = 1 << 1;
    }
}

pub struct FlagWord(AtomicU32);

impl FlagWord {
    pub const fn new() -> Self {
        FlagWord(AtomicU32::new(0))
    }

    /// ISR side: OR the given bits in.
    pub fn set(&self, flags: Flags) {
        self.0.fetch_or(flags.bits(), Ordering::Relaxed);
    }

    /// Main-loop side: atomically take and clear every set bit.
    pub fn take(&self) -> Flags {
        Flags::from_bits_truncate(self.0.swap(0, Ordering::Relaxed))
    }

    pub fn is_empty(&self) -> bool {
        self.0.load(Ordering::Relaxed) == 0
    }
}

impl Default for FlagWord {
    fn default() -> Self {
        Self::new()
    }
}

pub static FLAGS: FlagWord = FlagWord::new();
