mod averaging;
mod calibrate;
mod common;
mod list_ports;
mod protocol;

trait ToolRun {
    fn run(&self) -> anyhow::Result<()>;
}

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct ToolOptions {
    #[command(subcommand)]
    command: ToolCommand,
}

#[derive(clap::Subcommand, Debug)]
enum ToolCommand {
    Calibrate(calibrate::CalibrateOpts),
    ListPorts(list_ports::ListPortsOpts),
    Averaging(averaging::AveragingOpts),
}

impl ToolRun for ToolCommand {
    fn run(&self) -> anyhow::Result<()> {
        use ToolCommand::*;
        match self {
            Calibrate(o) => o.run(),
            ListPorts(o) => o.run(),
            Averaging(o) => o.run(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    use clap::Parser;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let opts = ToolOptions::parse();
    opts.command.run()
}
