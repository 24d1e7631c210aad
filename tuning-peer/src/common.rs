use std::time::Duration;

#[derive(clap::Args, Debug, Clone)]
pub struct SerialPortArgs {
    #[arg(default_value_t = default_serial_port())]
    port: String,
    #[arg(short, long, default_value_t = 115200)]
    baud: u32,
    #[arg(long)]
    plain_file: bool,
}

#[derive(Debug)]
pub enum SerialPort {
    Serial(Box<dyn serialport::SerialPort>),
    File(std::fs::File),
}

pub fn default_serial_port() -> String {
    if let Ok(infos) = serialport::available_ports() {
        for info in infos {
            #[cfg(target_os = "macos")]
            if info.port_name.ends_with(".Bluetooth-Incoming-Port") {
                continue;
            }

            return info.port_name.clone();
        }
    }

    // not great, but reasonable fallback
    "/dev/ttyUSB0".to_owned()
}

impl SerialPortArgs {
    pub fn open(&self) -> anyhow::Result<SerialPort> {
        if self.plain_file {
            let port = std::fs::File::options()
                .read(true)
                .write(true)
                .open(&self.port)?;
            Ok(SerialPort::File(port))
        } else {
            let port = serialport::new(&self.port, self.baud).open()?;
            Ok(SerialPort::Serial(port))
        }
    }
}

impl SerialPort {
    /// Blocking receive with a caller-chosen per-call timeout; the two
    /// steps of the calibration protocol use different timeouts for the
    /// same transport.
    pub fn recv_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> anyhow::Result<usize> {
        match self {
            SerialPort::Serial(port) => {
                port.set_timeout(timeout)?;
                match std::io::Read::read(port, buf) {
                    Ok(n) => Ok(n),
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                    Err(e) => Err(e.into()),
                }
            }
            SerialPort::File(file) => Ok(std::io::Read::read(file, buf)?),
        }
    }

    pub fn send(&mut self, buf: &[u8]) -> anyhow::Result<()> {
        match self {
            SerialPort::Serial(port) => Ok(std::io::Write::write_all(port, buf)?),
            SerialPort::File(file) => Ok(std::io::Write::write_all(file, buf)?),
        }
    }
}

impl crate::protocol::Transport for SerialPort {
    fn send(&mut self, buf: &[u8]) -> anyhow::Result<()> {
        SerialPort::send(self, buf)
    }

    fn recv_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> anyhow::Result<usize> {
        SerialPort::recv_timeout(self, buf, timeout)
    }
}

pub fn progress_bar(len: u64) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(len);
    bar.set_style(
        indicatif::ProgressStyle::with_template("({spinner}) [{wide_bar}] channel {pos}/{len}")
            .unwrap()
            .progress_chars("=> "),
    );
    bar
}
