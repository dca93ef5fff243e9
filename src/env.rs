//! Environment constants and path utilities for the relay.
//!
//! This module centralizes the protocol sentinels, fixed namespaces and the
//! configuration/session paths used throughout the application.

/// Main application directory name (hidden directory like .git, .vscode)
pub const RELAY_DIR_NAME: &str = ".qbxml-relay";

/// Configuration file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "qbxml-relay.toml";

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "QBXML_RELAY_CONFIG";

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "qbxml_relay=info";

/// Values the Web Connector client interprets as protocol signals
pub mod sentinel {
    /// Returned by `authenticate` for rejected or failed logins
    pub const INVALID_USER: &str = "nvu";

    /// Returned by `sendRequestXML` when there is no work (or no session)
    pub const NOTHING_TO_DO: &str = "";

    /// Returned by `receiveResponseXML` when the ticket is unknown
    pub const INVALID_SESSION: i32 = -1;

    /// Returned by `receiveResponseXML` when all work is complete
    pub const COMPLETE: i32 = 100;

    /// Returned by `connectionError`
    pub const DONE: &str = "done";

    /// Returned by `closeConnection`
    pub const CLOSE_ACK: &str = "OK";
}

/// SOAP and service namespaces
pub mod namespace {
    pub const SOAP_ENVELOPE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
    pub const WEB_CONNECTOR: &str = "http://developer.intuit.com/";
}

/// Session-related constants
pub mod session {
    /// Default session lifetime (24 hours)
    pub const DEFAULT_TTL_SECS: u64 = 24 * 60 * 60;

    /// Sessions directory name within the application directory
    pub const SESSIONS_DIR_NAME: &str = "sessions";

    /// Temp directory name used for atomic writes
    pub const TEMP_DIR_NAME: &str = "temp";
}

/// QBXML document constants
pub mod qbxml {
    /// QBXML version announced in outbound request documents
    pub const SPEC_VERSION: &str = "13.0";

    /// Default `MaxReturned` for generated query requests
    pub const DEFAULT_MAX_RETURNED: u32 = 100;
}

/// Common path utilities
use std::path::PathBuf;

/// Build the application directory path from a root
pub fn relay_dir_path(root: &std::path::Path) -> PathBuf {
    root.join(RELAY_DIR_NAME)
}

/// Build the file-backed session store directory path
pub fn sessions_dir_path(root: &std::path::Path) -> PathBuf {
    relay_dir_path(root).join(session::SESSIONS_DIR_NAME)
}

/// Build the path of a single persisted session document
pub fn session_file_path(sessions_dir: &std::path::Path, ticket: &str) -> PathBuf {
    sessions_dir.join(format!("{}.json", ticket))
}

/// Build config directory path in user's home directory
pub fn user_config_dir_path(home_dir: &std::path::Path) -> PathBuf {
    home_dir.join(RELAY_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &std::path::Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &std::path::Path) -> PathBuf {
    current_dir.join(RELAY_DIR_NAME).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_session_paths() {
        let root = Path::new("/srv/relay");

        assert_eq!(relay_dir_path(root), Path::new("/srv/relay/.qbxml-relay"));
        assert_eq!(
            sessions_dir_path(root),
            Path::new("/srv/relay/.qbxml-relay/sessions")
        );
        assert_eq!(
            session_file_path(&sessions_dir_path(root), "abc-123"),
            Path::new("/srv/relay/.qbxml-relay/sessions/abc-123.json")
        );
    }

    #[test]
    fn test_config_paths() {
        let home_dir = Path::new("/home/user");
        let current_dir = Path::new("/current/project");

        assert_eq!(
            user_config_file_path(home_dir),
            Path::new("/home/user/.qbxml-relay/config.toml")
        );

        assert_eq!(
            local_config_file_path(current_dir),
            Path::new("/current/project/.qbxml-relay/config.toml")
        );
    }
}
