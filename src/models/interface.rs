use serde::{Deserialize, Serialize};

/// A capture device as shown by `--list-devices`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// Device system name (used for capture operations)
    pub device_name: String,

    /// Interface description
    pub description: Option<String>,

    /// IPv4 address (if available)
    pub ipv4_address: Option<String>,

    /// MAC address (if available)
    pub mac_address: Option<String>,

    /// Whether this is a loopback interface
    pub is_loopback: bool,
}

impl InterfaceInfo {
    /// Create a new interface info with just the device name
    pub fn new(device_name: String) -> Self {
        Self {
            device_name,
            description: None,
            ipv4_address: None,
            mac_address: None,
            is_loopback: false,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// One line for the device listing
    pub fn formatted_display(&self) -> String {
        let mut line = self.device_name.clone();
        if let Some(desc) = self.description.as_deref().filter(|d| !d.is_empty()) {
            line.push_str(&format!(": {}", desc));
        }
        if let Some(ip) = &self.ipv4_address {
            line.push_str(&format!(" ({})", ip));
        }
        if self.is_loopback {
            line.push_str(" [loopback]");
        }
        line
    }
}
