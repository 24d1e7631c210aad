use crate::protocol::{Coordinator, PeerState};

#[derive(clap::Args, Debug)]
pub struct CalibrateOpts {
    #[command(flatten)]
    port: crate::common::SerialPortArgs,
}

impl crate::ToolRun for CalibrateOpts {
    fn run(&self) -> anyhow::Result<()> {
        let port = self.port.open()?;
        let mut coordinator = Coordinator::new(port);

        let bar = crate::common::progress_bar(2 * tuning_core::config::NUM_CHANNELS as u64);
        bar.set_message("averaging");

        coordinator.run(|channel, state| {
            match state {
                PeerState::RxAveraging => bar.set_message(format!("averaging ch{channel}")),
                PeerState::RxAck => bar.set_message(format!("acking ch{channel}")),
                PeerState::SmartStakeRx => bar.set_message("smart-stake"),
            }
            bar.inc(1);
        })?;

        bar.finish_with_message("smart-stake rx");
        println!("calibration handshake complete, now in SmartStake RX mode");
        Ok(())
    }
}
