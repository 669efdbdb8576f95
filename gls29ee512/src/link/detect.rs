//! Serial device auto-discovery.
//!
//! The programmer bridge enumerates as a USB CDC serial device. When no
//! explicit device path is given, discovery must resolve to exactly one
//! USB serial candidate; zero or multiple candidates is a configuration
//! error reported to the operator rather than a guess.

use crate::error::{Error, Result};
use log::{debug, info, trace};

/// Detected serial port information.
#[derive(Debug, Clone)]
pub struct DetectedPort {
    /// Port name/path (e.g., "/dev/ttyACM0" or "COM3").
    pub name: String,
    /// USB Vendor ID (if available).
    pub vid: Option<u16>,
    /// USB Product ID (if available).
    pub pid: Option<u16>,
    /// Device manufacturer string (if available).
    pub manufacturer: Option<String>,
    /// Device product string (if available).
    pub product: Option<String>,
    /// Serial number (if available).
    pub serial: Option<String>,
}

impl DetectedPort {
    /// Whether the port is a USB serial device (a programmer candidate).
    pub fn is_usb(&self) -> bool {
        self.vid.is_some()
    }
}

/// Detect all available serial ports with USB device information.
pub fn detect_ports() -> Vec<DetectedPort> {
    let mut result = Vec::new();

    match serialport::available_ports() {
        Ok(ports) => {
            for port_info in ports {
                let mut detected = DetectedPort {
                    name: port_info.port_name.clone(),
                    vid: None,
                    pid: None,
                    manufacturer: None,
                    product: None,
                    serial: None,
                };

                if let serialport::SerialPortType::UsbPort(usb_info) = port_info.port_type {
                    detected.vid = Some(usb_info.vid);
                    detected.pid = Some(usb_info.pid);
                    detected.manufacturer = usb_info.manufacturer;
                    detected.product = usb_info.product;
                    detected.serial = usb_info.serial_number;

                    trace!(
                        "Found USB port: {} (VID: {:04X}, PID: {:04X})",
                        port_info.port_name,
                        detected.vid.unwrap_or(0),
                        detected.pid.unwrap_or(0)
                    );
                }

                result.push(detected);
            }
        },
        Err(e) => {
            debug!("Failed to enumerate serial ports: {e}");
        },
    }

    result
}

/// Resolve the programmer device automatically.
///
/// Exactly one USB serial candidate must exist. Zero candidates is
/// [`Error::DeviceNotFound`]; more than one is [`Error::AmbiguousDevice`],
/// and the operator must pass the device path explicitly.
pub fn auto_detect_device() -> Result<DetectedPort> {
    let mut candidates: Vec<DetectedPort> = detect_ports()
        .into_iter()
        .filter(DetectedPort::is_usb)
        .collect();

    match candidates.len() {
        0 => Err(Error::DeviceNotFound),
        1 => {
            let port = candidates.remove(0);
            info!("Auto-detected programmer: {}", port.name);
            Ok(port)
        },
        n => Err(Error::AmbiguousDevice(n)),
    }
}
