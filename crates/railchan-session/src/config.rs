use serde::{Deserialize, Serialize};

use railchan_pdu::order::{CLIENTSTATUS_ALLOWLOCALMOVESIZE, CLIENT_BUILD_NUMBER};

/// Local settings for one RAIL session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Application or document the server should launch.
    pub exe_or_file: String,
    /// Working directory for the launched application.
    pub working_dir: String,
    /// Command-line arguments for the launched application.
    pub arguments: String,
    /// Build number sent in the client Handshake PDU.
    pub client_build_number: u32,
    /// Flags sent in the Client Information PDU.
    pub client_status_flags: u32,
    /// Icon caches proposed in the window capability set.
    pub icon_cache_count: u8,
    /// Entries per icon cache proposed in the window capability set.
    pub icon_cache_entries: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exe_or_file: String::new(),
            working_dir: String::new(),
            arguments: String::new(),
            client_build_number: CLIENT_BUILD_NUMBER,
            client_status_flags: CLIENTSTATUS_ALLOWLOCALMOVESIZE,
            icon_cache_count: 2,
            icon_cache_entries: 10,
        }
    }
}
