//! Device profile definitions
//!
//! A profile names the board on the far end of the serial link and
//! supplies its console defaults.

/// Console defaults for a family of boards
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    /// Display name used in the status line (e.g., "ESP32")
    pub name: String,
    /// Short identifier (e.g., "esp32")
    pub id: String,
    pub description: String,
    /// Baud rate of the board's console UART
    pub baud_rate: u32,
    /// USB vendor IDs of adapters commonly found on this board
    pub usb_vendor_ids: Vec<u16>,
}

impl DeviceProfile {
    /// Create a profile with the usual 115200 baud console and no known adapters
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            description: String::new(),
            baud_rate: 115200,
            usb_vendor_ids: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_usb_vendor_ids(mut self, vids: &[u16]) -> Self {
        self.usb_vendor_ids = vids.to_vec();
        self
    }

    /// Check whether a USB adapter with this vendor ID is typical for the board
    pub fn matches_usb_vendor(&self, vid: u16) -> bool {
        self.usb_vendor_ids.contains(&vid)
    }
}
