//! Configuration loading and root folder resolution
//!
//! Two tiers, same as the runtime split in the database:
//! 1. **TOML bootstrap**: ports, root folder, authentication handshake,
//!    directory source, geocoding credentials, logging level
//! 2. **Database runtime**: site settings in the `settings` table
//!
//! A missing TOML file never stops startup. The loader warns and continues
//! with compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "STACKS_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "STACKS_ROOT_FOLDER";

/// Database filename inside the root folder
pub const DATABASE_FILENAME: &str = "stacks.db";

/// Minutes an authentication handshake stays valid when not configured
pub const DEFAULT_AUTH_TIMEOUT_MINUTES: i64 = 2;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and uploaded files
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub ops: ServerConfig,

    #[serde(default)]
    pub promenade: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub geocoding: GeocodingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener settings for one application
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port; each binary supplies its own default
    #[serde(default)]
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

/// Directory authentication handshake
///
/// `redirect_url` contains `{0}` for the handshake id and `{1}` for the
/// cache discriminator. Leaving it unset disables authentication entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub redirect_url: Option<String>,

    /// Accepts an integer or a string; unparseable values fall back to the default
    #[serde(default)]
    pub timeout_minutes: Option<toml::Value>,

    /// Directory domain prefixed to usernames, as in `LIBRARY\jdoe`
    #[serde(default)]
    pub domain_name: Option<String>,

    #[serde(default)]
    pub cache_discriminator: Option<String>,
}

impl AuthConfig {
    /// Handshake redirect template, if authentication is enabled
    pub fn redirect_template(&self) -> Option<&str> {
        self.redirect_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Handshake timeout in minutes
    pub fn timeout_minutes(&self) -> i64 {
        match &self.timeout_minutes {
            None => DEFAULT_AUTH_TIMEOUT_MINUTES,
            Some(toml::Value::Integer(minutes)) if *minutes > 0 => *minutes,
            Some(toml::Value::String(text)) => match text.trim().parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => {
                    warn!(
                        "Invalid auth timeout configured ({}), using default {} minutes",
                        text, DEFAULT_AUTH_TIMEOUT_MINUTES
                    );
                    DEFAULT_AUTH_TIMEOUT_MINUTES
                }
            },
            Some(other) => {
                warn!(
                    "Invalid auth timeout configured ({}), using default {} minutes",
                    other, DEFAULT_AUTH_TIMEOUT_MINUTES
                );
                DEFAULT_AUTH_TIMEOUT_MINUTES
            }
        }
    }

    pub fn cache_discriminator(&self) -> &str {
        self.cache_discriminator.as_deref().unwrap_or("")
    }
}

/// Staff directory source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    /// TOML file of directory entries; absent means no directory enrichment
    #[serde(default)]
    pub users_file: Option<PathBuf>,
}

/// Geocoding service credentials
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_geocoding_endpoint(),
        }
    }
}

fn default_geocoding_endpoint() -> String {
    "https://maps.googleapis.com/maps/api/geocode/json".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load the bootstrap configuration
    ///
    /// Resolution order: explicit path, `STACKS_CONFIG`, then the platform
    /// config locations. Nothing found means compiled defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var(CONFIG_ENV_VAR)
                .ok()
                .map(PathBuf::from)
                .or_else(find_config_file),
        };

        let Some(path) = path else {
            warn!("No config file found, using compiled defaults");
            return Ok(Self::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content)
            }
            Err(e) => {
                warn!(
                    "Could not read config file {}: {} (using compiled defaults)",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }
}

/// Platform config locations, user before system
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("stacks").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/stacks/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Root folder resolution in priority order:
/// 1. Command-line argument
/// 2. `STACKS_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent compiled default
pub struct RootFolderResolver<'a> {
    cli_arg: Option<&'a Path>,
    config: &'a TomlConfig,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new(cli_arg: Option<&'a Path>, config: &'a TomlConfig) -> Self {
        Self { cli_arg, config }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = self.cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.config.root_folder {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("stacks"))
        .unwrap_or_else(|| PathBuf::from("./stacks_data"))
}

/// Creates the root folder layout on first run
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        std::fs::create_dir_all(self.profile_pictures_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILENAME)
    }

    pub fn profile_pictures_path(&self) -> PathBuf {
        self.root_folder.join("profile-pictures")
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}
