//! Offline replay of the step-1 averaging rule against a recorded sample
//! log, for debugging a calibration run without a radio attached.

use tuning_core::TuningCode;

#[derive(clap::Args, Debug)]
pub struct AveragingOpts {
    /// File of whitespace-separated "coarse mid fine" triples, one per line.
    samples: String,
}

impl crate::ToolRun for AveragingOpts {
    fn run(&self) -> anyhow::Result<()> {
        let text = std::fs::read_to_string(&self.samples)?;
        let mut samples = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [coarse, mid, fine] = fields.as_slice() else {
                anyhow::bail!("line {}: expected 3 fields, got {}", lineno + 1, fields.len());
            };
            samples.push(TuningCode::new(coarse.parse()?, mid.parse()?, fine.parse()?));
        }

        let (codes, num_runs) = tuning_wire::average_runs(&samples);
        if num_runs > tuning_core::config::MAX_TX_CODES_PER_CHANNEL {
            eprintln!(
                "warning: {} runs recorded, only the first {} are kept",
                num_runs,
                tuning_core::config::MAX_TX_CODES_PER_CHANNEL
            );
        }
        for code in codes.iter().take(num_runs.min(codes.len())) {
            println!("{} {} {}", code.coarse, code.mid, code.fine);
        }

        Ok(())
    }
}
