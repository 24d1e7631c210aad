#[derive(clap::Args, Debug)]
pub struct ListPortsOpts;

impl crate::ToolRun for ListPortsOpts {
    fn run(&self) -> anyhow::Result<()> {
        for port in serialport::available_ports()? {
            if port.port_name == crate::common::default_serial_port() {
                println!("* {}", port.port_name);
            } else {
                println!("  {}", port.port_name);
            }
            if let serialport::SerialPortType::UsbPort(usb) = port.port_type {
                println!("    - USB {:x}:{:x}", usb.vid, usb.pid);
                if let Some(serial_number) = usb.serial_number {
                    println!("    - S/N: {serial_number}");
                }
                if let Some(product) = usb.product {
                    println!("    - {product}");
                }
            }
        }

        Ok(())
    }
}
