//! UART trace line formatting, in the two formats diagnostic tooling on
//! the peer side expects: a new compact form and a legacy numeric form.

use core::fmt::Write;

use tuning_core::TuningCode;
use tuning_hal::{Direction, Trace};

fn dir_char(dir: Direction) -> char {
    match dir {
        Direction::Rx => 'R',
        Direction::Tx => 'T',
    }
}

/// Formats trace lines into any [`core::fmt::Write`] sink (a UART TX
/// half, or anything else that implements it).
pub struct LineTrace<W> {
    sink: W,
}

impl<W> LineTrace<W> {
    pub fn new(sink: W) -> Self {
        LineTrace { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> Trace for LineTrace<W> {
    fn trace_code(&mut self, dir: Direction, channel: u8, code: TuningCode) {
        let _ = writeln!(
            self.sink,
            "{}X {} {}.{}.{}",
            dir_char(dir),
            channel,
            code.coarse,
            code.mid,
            code.fine
        );
    }

    fn trace_legacy(&mut self, dir: Direction, channel: u8, code: TuningCode) {
        let _ = writeln!(
            self.sink,
            "{}{:02} {:02} {:02} {:02}",
            dir_char(dir),
            channel,
            code.coarse,
            code.mid,
            code.fine
        );
    }
}

#[cfg(test)]
mod test {
    extern crate alloc;

    use super::*;

    #[derive(Default)]
    struct Buf(alloc::string::String);

    impl Write for Buf {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            self.0.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn new_format_matches_spec_shape() {
        let mut trace = LineTrace::new(Buf::default());
        trace.trace_code(Direction::Rx, 17, TuningCode::new(20, 15, 10));
        assert_eq!(trace.into_inner().0, "RX 17 20.15.10\n");
    }

    #[test]
    fn legacy_format_matches_spec_shape() {
        let mut trace = LineTrace::new(Buf::default());
        trace.trace_legacy(Direction::Tx, 17, TuningCode::new(20, 15, 10));
        assert_eq!(trace.into_inner().0, "T17 20 15 10\n");
    }
}
