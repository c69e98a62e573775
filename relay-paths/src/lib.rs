//! XDG Base Directory paths for relay.
//!
//! CLI tools should use XDG paths for cross-platform consistency,
//! not platform-native paths. This matches tools like gh, docker, kubectl.

use std::path::PathBuf;

/// File name of the persisted credential store inside [`config_dir`].
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// File name of the user configuration inside [`config_dir`].
pub const CONFIG_FILE: &str = "config.toml";

/// Get the relay config directory.
///
/// Returns `$XDG_CONFIG_HOME/relay` if set, otherwise `~/.config/relay`.
/// This is where the config file and the persisted credential store live.
///
/// # Examples
///
/// ```
/// use relay_paths::config_dir;
///
/// let config = config_dir();
/// let store = config.join("credentials.json");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("relay")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/relay")
    } else {
        PathBuf::from(".config/relay")
    }
}

/// Default location of the persisted credential store.
pub fn credentials_path() -> PathBuf {
    config_dir().join(CREDENTIALS_FILE)
}

/// Default location of the user configuration file.
pub fn user_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}
