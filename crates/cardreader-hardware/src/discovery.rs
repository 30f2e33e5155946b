//! Serial port discovery.
//!
//! Finds the port the reader firmware is attached to. Ports that identify
//! as an Arduino board (Arduino USB vendor ID, or "Arduino" in the USB
//! manufacturer/product strings) are preferred. When no port identifies
//! itself that way every enumerated port is a candidate, since many
//! USB-serial bridges and platforms report no USB metadata at all.

use cardreader_core::constants::{ARDUINO_PRODUCT_MARKER, ARDUINO_USB_VID};
use serde::{Deserialize, Serialize};
use serialport::{SerialPortInfo, SerialPortType};
use tracing::{debug, info};

use crate::{HardwareError, Result};

/// A serial port that may be the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortCandidate {
    /// Device path (`/dev/ttyACM0`, `COM3`, ...).
    pub name: String,

    /// USB vendor ID, if the port is a USB device.
    pub vid: Option<u16>,

    /// USB product ID, if the port is a USB device.
    pub pid: Option<u16>,

    /// USB manufacturer string.
    pub manufacturer: Option<String>,

    /// USB product string.
    pub product: Option<String>,
}

impl PortCandidate {
    /// Candidate without any USB metadata.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        }
    }

    /// Check whether the port identifies as an Arduino board.
    pub fn is_arduino(&self) -> bool {
        if self.vid == Some(ARDUINO_USB_VID) {
            return true;
        }

        [&self.manufacturer, &self.product]
            .into_iter()
            .flatten()
            .any(|text| text.contains(ARDUINO_PRODUCT_MARKER))
    }

    /// Short human readable description.
    pub fn description(&self) -> String {
        match (&self.product, self.vid, self.pid) {
            (Some(product), Some(vid), Some(pid)) => {
                format!("{} ({product}, {vid:04x}:{pid:04x})", self.name)
            }
            (Some(product), _, _) => format!("{} ({product})", self.name),
            (None, Some(vid), Some(pid)) => format!("{} ({vid:04x}:{pid:04x})", self.name),
            _ => self.name.clone(),
        }
    }
}

impl From<SerialPortInfo> for PortCandidate {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                name: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            _ => Self::named(info.port_name),
        }
    }
}

/// Narrow a list of ports to the ones worth trying, best first.
///
/// Arduino ports win when there are any; otherwise every port is kept in
/// enumeration order.
pub fn select_candidates(ports: Vec<PortCandidate>) -> Vec<PortCandidate> {
    let (arduino, other): (Vec<_>, Vec<_>) = ports.into_iter().partition(|p| p.is_arduino());
    if arduino.is_empty() { other } else { arduino }
}

/// Enumerate all serial ports on the system.
pub fn list_ports() -> Result<Vec<PortCandidate>> {
    let ports: Vec<PortCandidate> = serialport::available_ports()?
        .into_iter()
        .map(PortCandidate::from)
        .collect();
    debug!("Enumerated {} serial ports", ports.len());
    Ok(ports)
}

/// Find the port the reader is most likely attached to.
///
/// # Errors
///
/// Returns `HardwareError::PortNotFound` if no serial port exists.
pub fn discover_reader_port() -> Result<PortCandidate> {
    let candidate = select_candidates(list_ports()?)
        .into_iter()
        .next()
        .ok_or_else(|| HardwareError::port_not_found("no serial ports available"))?;

    info!("Discovered reader port {}", candidate.description());
    Ok(candidate)
}
