//! Configuration file loading.
//!
//! The configuration is an INI document with one section per category plus
//! sections for the FTP endpoint and the cumulative store:
//!
//! ```ini
//! [FTP]
//! host     = ftp.example.org
//! username = export
//! password = secret
//!
//! [Kompletter Abzug]
//! filename_pattern = ^SA-MARC-ixtheo-(\d\d\d\d\d\d).tar.gz$
//! remote_directory = /ixtheo
//!
//! [Differenzabzug]
//! filename_pattern = ^(?:TA-MARC-ixtheo|SA-MARC-ixtheo_o|TA-MARC-ixtheo_o)-(\d\d\d\d\d\d).tar.gz$
//! remote_directory = /ixtheo
//! paired           = true
//!
//! [Loeschlisten]
//! filename_pattern = ^LOEPPN-(\d\d\d\d\d\d)$
//! remote_directory = /sekkor
//!
//! [Kumulierte Abzuege]
//! output_directory = /var/lib/marcsync/cumulated
//! ```
//!
//! Optional categories take part in a run only when their section exists.
//! The whole document is validated (every pattern compiled) before the
//! engine opens a remote connection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::{Ini, ParseOption, Properties};
use thiserror::Error;

use crate::category::{Category, CategoryKind, FilenameMatcher};
use crate::retry::{RetryPolicy, DEFAULT_BACKOFF_STEP_SECS, DEFAULT_LISTING_ATTEMPTS};

/// Section holding the remote endpoint credentials.
pub const FTP_SECTION: &str = "FTP";

/// Section holding the cumulative store location.
pub const STORE_SECTION: &str = "Kumulierte Abzuege";

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Configuration file name inside the config directory.
const CONFIG_FILE_NAME: &str = "marcsync.conf";

/// Errors raised while reading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid INI.
    #[error("failed to parse config file: {0}")]
    Parse(String),

    /// A required section is absent.
    #[error("missing section [{0}] in config file")]
    MissingSection(String),

    /// A required key is absent from a section.
    #[error("missing key \"{key}\" in section [{section}]")]
    MissingKey { section: String, key: String },

    /// A filename pattern does not compile or has the wrong shape.
    #[error("filename pattern \"{pattern}\" is invalid: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A value cannot be interpreted.
    #[error("invalid value \"{value}\" for {section}.{key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

/// Connection settings for the remote endpoint.
#[derive(Debug, Clone)]
pub struct FtpConfig {
    /// Host name or address.
    pub host: String,
    /// Control port.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Retry policy for directory listings.
    pub listing_retry: RetryPolicy,
}

impl FtpConfig {
    /// Create connection settings with the default port and retry policy.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_FTP_PORT,
            username: username.into(),
            password: password.into(),
            listing_retry: RetryPolicy::listing(),
        }
    }

    /// Set the control port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the listing retry policy.
    pub fn with_listing_retry(mut self, policy: RetryPolicy) -> Self {
        self.listing_retry = policy;
        self
    }

    /// `host:port`, as passed to the FTP client.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Validated configuration for a synchronization run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote endpoint settings.
    pub ftp: FtpConfig,
    /// Configured categories in priority order.
    pub categories: Vec<Category>,
    /// Directory of the cumulative store.
    pub store_directory: PathBuf,
}

impl SyncConfig {
    /// Create a configuration from already-validated parts.
    ///
    /// Categories are kept in priority order regardless of the order given.
    pub fn new(ftp: FtpConfig, mut categories: Vec<Category>, store_directory: PathBuf) -> Self {
        categories.sort_by_key(|c| c.kind);
        Self {
            ftp,
            categories,
            store_directory,
        }
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_ini_str(&contents)
    }

    /// Parse and validate a configuration document.
    pub fn from_ini_str(contents: &str) -> Result<Self, ConfigError> {
        // Escapes stay off: patterns are full of backslashes.
        let options = ParseOption {
            enabled_escape: false,
            enabled_quote: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(contents, options)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let ftp = parse_ftp(&ini)?;

        let mut categories = Vec::new();
        for kind in CategoryKind::ALL {
            match ini.section(Some(kind.section())) {
                Some(section) => categories.push(parse_category(kind, section)?),
                None if kind.is_required() => {
                    return Err(ConfigError::MissingSection(kind.section().to_string()))
                }
                None => {}
            }
        }

        let store = required_section(&ini, STORE_SECTION)?;
        let store_directory = PathBuf::from(required_key(store, STORE_SECTION, "output_directory")?);

        Ok(Self::new(ftp, categories, store_directory))
    }

    /// The configured category of the given kind.
    pub fn category(&self, kind: CategoryKind) -> Option<&Category> {
        self.categories.iter().find(|c| c.kind == kind)
    }
}

/// Default config file path: `<config dir>/marcsync/marcsync.conf`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("marcsync").join(CONFIG_FILE_NAME))
}

fn parse_ftp(ini: &Ini) -> Result<FtpConfig, ConfigError> {
    let section = required_section(ini, FTP_SECTION)?;

    let host = required_key(section, FTP_SECTION, "host")?;
    let username = required_key(section, FTP_SECTION, "username")?;
    let password = required_key(section, FTP_SECTION, "password")?;

    let port = optional_number(section, FTP_SECTION, "port")?.unwrap_or(DEFAULT_FTP_PORT);
    let attempts = optional_number(section, FTP_SECTION, "listing_attempts")?
        .unwrap_or(DEFAULT_LISTING_ATTEMPTS);
    let step = optional_number(section, FTP_SECTION, "listing_backoff_secs")?
        .unwrap_or(DEFAULT_BACKOFF_STEP_SECS);

    Ok(FtpConfig::new(host, username, password)
        .with_port(port)
        .with_listing_retry(RetryPolicy::linear(attempts, Duration::from_secs(step))))
}

fn parse_category(kind: CategoryKind, section: &Properties) -> Result<Category, ConfigError> {
    let name = kind.section();
    let pattern = required_key(section, name, "filename_pattern")?;

    // `directory_on_ftp_server` is the older spelling of the key.
    let directory = section
        .get("remote_directory")
        .or_else(|| section.get("directory_on_ftp_server"))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingKey {
            section: name.to_string(),
            key: "remote_directory".to_string(),
        })?;

    let paired = match section.get("paired").map(str::trim) {
        None => false,
        Some(value) => parse_bool(value).ok_or_else(|| ConfigError::InvalidValue {
            section: name.to_string(),
            key: "paired".to_string(),
            value: value.to_string(),
        })?,
    };

    let matcher = FilenameMatcher::new(pattern, paired)?;
    Ok(Category::new(kind, matcher, directory))
}

fn required_section<'a>(ini: &'a Ini, name: &str) -> Result<&'a Properties, ConfigError> {
    ini.section(Some(name))
        .ok_or_else(|| ConfigError::MissingSection(name.to_string()))
}

fn required_key<'a>(section: &'a Properties, name: &str, key: &str) -> Result<&'a str, ConfigError> {
    section
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingKey {
            section: name.to_string(),
            key: key.to_string(),
        })
}

fn optional_number<T: std::str::FromStr>(
    section: &Properties,
    name: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match section.get(key).map(str::trim) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                section: name.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r"
[FTP]
host     = ftp.example.org
username = export
password = secret

[Kompletter Abzug]
filename_pattern = ^SA-MARC-ixtheo-(\d\d\d\d\d\d).tar.gz$
directory_on_ftp_server = /ixtheo

[Differenzabzug]
filename_pattern = ^(?:TA-MARC-ixtheo|SA-MARC-ixtheo_o|TA-MARC-ixtheo_o)-(\d\d\d\d\d\d).tar.gz$
remote_directory = /ixtheo
paired = true

[Loeschlisten]
filename_pattern = ^LOEPPN-(\d\d\d\d\d\d)$
remote_directory = /sekkor

[Kumulierte Abzuege]
output_directory = /var/lib/marcsync/cumulated
";

    fn with_extra(extra: &str) -> String {
        format!("{}\n{}", MINIMAL, extra)
    }

    #[test]
    fn test_parses_minimal_config() {
        let config = SyncConfig::from_ini_str(MINIMAL).unwrap();

        assert_eq!(config.ftp.host, "ftp.example.org");
        assert_eq!(config.ftp.port, DEFAULT_FTP_PORT);
        assert_eq!(config.ftp.username, "export");
        assert_eq!(config.ftp.address(), "ftp.example.org:21");
        assert_eq!(config.ftp.listing_retry, RetryPolicy::listing());
        assert_eq!(
            config.store_directory,
            PathBuf::from("/var/lib/marcsync/cumulated")
        );

        let kinds: Vec<_> = config.categories.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CategoryKind::FullDump,
                CategoryKind::Differential,
                CategoryKind::DeletionList
            ]
        );
    }

    #[test]
    fn test_backslashes_survive() {
        let config = SyncConfig::from_ini_str(MINIMAL).unwrap();
        let full = config.category(CategoryKind::FullDump).unwrap();
        assert_eq!(full.matcher.pattern(), r"^SA-MARC-ixtheo-(\d\d\d\d\d\d).tar.gz$");
        assert!(full.matcher.matches("SA-MARC-ixtheo-200102.tar.gz").is_some());
        assert_eq!(full.remote_directory, "/ixtheo");
    }

    #[test]
    fn test_paired_flag() {
        let config = SyncConfig::from_ini_str(MINIMAL).unwrap();
        assert!(config
            .category(CategoryKind::Differential)
            .unwrap()
            .matcher
            .requires_paired_instances());
        assert!(!config
            .category(CategoryKind::FullDump)
            .unwrap()
            .matcher
            .requires_paired_instances());
    }

    #[test]
    fn test_optional_categories_detected_by_section() {
        let config = SyncConfig::from_ini_str(&with_extra(
            r"
[Normdatendifferenzabzug]
filename_pattern = ^(?:WA-MARCcomb)-(\d\d\d\d\d\d).tar.gz$
remote_directory = /sekkor

[Errors]
filename_pattern = ^Errors_ixtheo_(\d\d\d\d\d\d)$
remote_directory = /ixtheo
",
        ))
        .unwrap();

        let kinds: Vec<_> = config.categories.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CategoryKind::FullDump,
                CategoryKind::Differential,
                CategoryKind::DeletionList,
                CategoryKind::ErrorReport,
                CategoryKind::AuthorityDifferential,
            ]
        );
    }

    #[test]
    fn test_retry_overrides() {
        let text = MINIMAL.replace(
            "password = secret",
            "password = secret\nport = 2121\nlisting_attempts = 5\nlisting_backoff_secs = 1",
        );
        let config = SyncConfig::from_ini_str(&text).unwrap();
        assert_eq!(config.ftp.port, 2121);
        assert_eq!(
            config.ftp.listing_retry,
            RetryPolicy::linear(5, Duration::from_secs(1))
        );
    }

    #[test]
    fn test_missing_required_section() {
        let text = MINIMAL.replace("[Loeschlisten]", "[Unrelated]");
        assert!(matches!(
            SyncConfig::from_ini_str(&text),
            Err(ConfigError::MissingSection(s)) if s == "Loeschlisten"
        ));
    }

    #[test]
    fn test_missing_store_section() {
        let text = MINIMAL.replace("[Kumulierte Abzuege]", "[Elsewhere]");
        assert!(matches!(
            SyncConfig::from_ini_str(&text),
            Err(ConfigError::MissingSection(s)) if s == STORE_SECTION
        ));
    }

    #[test]
    fn test_missing_key() {
        let text = MINIMAL.replace("username = export", "");
        assert!(matches!(
            SyncConfig::from_ini_str(&text),
            Err(ConfigError::MissingKey { key, .. }) if key == "username"
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let text = MINIMAL.replace(r"^LOEPPN-(\d\d\d\d\d\d)$", r"^LOEPPN-\d\d\d\d\d\d$");
        assert!(matches!(
            SyncConfig::from_ini_str(&text),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_invalid_paired_value() {
        let text = MINIMAL.replace("paired = true", "paired = maybe");
        assert!(matches!(
            SyncConfig::from_ini_str(&text),
            Err(ConfigError::InvalidValue { key, .. }) if key == "paired"
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = SyncConfig::load(Path::new("/nonexistent/marcsync.conf"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_default_config_path_file_name() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("marcsync/marcsync.conf"));
        }
    }
}
