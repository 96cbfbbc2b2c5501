//! Warden configuration types.
//!
//! Every section is optional. Values are validated at load time so that a bad
//! poll interval or page size is rejected before any OS call is made.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, WardenError};

/// Smallest enumeration buffer able to hold one record header.
pub const MIN_PAGE_SIZE: usize = 16;

/// Default registry key holding the attach opt-out list.
pub const DEFAULT_POLICY_KEY: &str = r"SOFTWARE\Warden\AttachPolicy";

/// Default registry value holding the attach opt-out list.
///
/// Presence in this list means a module is opted out. The Filter Manager's
/// own `DevDriveAllowedFilters` value has the opposite meaning and must not
/// be used as the location.
pub const DEFAULT_POLICY_VALUE: &str = "DevDriveExcludedFilters";

/// Filter Manager value listing modules allowed on developer volumes.
pub const OS_ALLOWED_FILTERS_VALUE: &str = "DevDriveAllowedFilters";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Service lifecycle settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Bounded-wait polling settings.
    #[serde(default)]
    pub poll: PollPolicy,

    /// Filter enumeration settings.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Location of the attach opt-out list.
    #[serde(default)]
    pub attach_policy: AttachPolicyLocation,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WardenConfig {
    /// Validates every section.
    ///
    /// # Errors
    /// Returns [`WardenError::Config`] naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.poll.validate()?;
        self.filter.validate()?;
        self.attach_policy.validate()?;
        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text cannot be parsed or is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| WardenError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| WardenError::config(format!("failed to read config: {e}")))?;
        Self::from_toml_str(&content)
    }
}

/// Service lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Bound for start, stop and uninstall waits.
    #[serde(default = "default_service_timeout")]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_service_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout: default_service_timeout(),
        }
    }
}

/// Sleep schedule for bounded waits.
///
/// Each step sleeps `min(max_interval, max(wait_hint / 10, hint_floor))`.
/// With the defaults the floor always exceeds the ceiling, so the step is
/// `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Lower bound applied to a tenth of the service's wait hint.
    #[serde(default = "default_hint_floor")]
    #[serde(with = "humantime_serde")]
    pub hint_floor: Duration,

    /// Upper bound on a single sleep.
    #[serde(default = "default_max_interval")]
    #[serde(with = "humantime_serde")]
    pub max_interval: Duration,
}

fn default_hint_floor() -> Duration {
    Duration::from_secs(5)
}

fn default_max_interval() -> Duration {
    Duration::from_millis(500)
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            hint_floor: default_hint_floor(),
            max_interval: default_max_interval(),
        }
    }
}

impl PollPolicy {
    /// Creates a fixed-interval policy.
    #[must_use]
    pub const fn fixed(interval: Duration) -> Self {
        Self {
            hint_floor: interval,
            max_interval: interval,
        }
    }

    /// Returns the sleep for a status carrying `wait_hint`.
    #[must_use]
    pub fn interval_for(&self, wait_hint: Duration) -> Duration {
        (wait_hint / 10).max(self.hint_floor).min(self.max_interval)
    }

    /// Validates the policy.
    ///
    /// # Errors
    /// Returns an error if `max_interval` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_interval.is_zero() {
            return Err(WardenError::config("poll.max_interval must be > 0"));
        }
        Ok(())
    }
}

/// Filter enumeration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Enumeration buffer size in bytes.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    512
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl FilterConfig {
    /// Validates the settings.
    ///
    /// # Errors
    /// Returns an error if the page cannot hold a record header.
    pub fn validate(&self) -> Result<()> {
        if self.page_size < MIN_PAGE_SIZE {
            return Err(WardenError::config(format!(
                "filter.page_size must be >= {MIN_PAGE_SIZE}"
            )));
        }
        Ok(())
    }
}

/// Registry location of the attach opt-out list, relative to the local
/// machine hive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachPolicyLocation {
    /// Key path.
    #[serde(default = "default_policy_key")]
    pub key: String,

    /// Value name.
    #[serde(default = "default_policy_value")]
    pub value: String,
}

fn default_policy_key() -> String {
    DEFAULT_POLICY_KEY.to_string()
}

fn default_policy_value() -> String {
    DEFAULT_POLICY_VALUE.to_string()
}

impl Default for AttachPolicyLocation {
    fn default() -> Self {
        Self {
            key: default_policy_key(),
            value: default_policy_value(),
        }
    }
}

impl AttachPolicyLocation {
    /// Validates the location.
    ///
    /// # Errors
    /// Returns an error if the key or value name is empty, or if the value is
    /// the Filter Manager's allow-list, whose entries mean the opposite.
    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(WardenError::config("attach_policy.key cannot be empty"));
        }
        if self.value.trim().is_empty() {
            return Err(WardenError::config("attach_policy.value cannot be empty"));
        }
        if self.value.trim().eq_ignore_ascii_case(OS_ALLOWED_FILTERS_VALUE) {
            return Err(WardenError::config(format!(
                "attach_policy.value cannot be {OS_ALLOWED_FILTERS_VALUE}: its entries are allowed modules, not opted-out ones"
            )));
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = WardenConfig::default();
        assert_eq!(config.service.timeout, Duration::from_secs(30));
        assert_eq!(config.poll.hint_floor, Duration::from_secs(5));
        assert_eq!(config.poll.max_interval, Duration::from_millis(500));
        assert_eq!(config.filter.page_size, 512);
        assert_eq!(config.attach_policy.key, DEFAULT_POLICY_KEY);
        assert_eq!(config.attach_policy.value, DEFAULT_POLICY_VALUE);
        assert_eq!(config.logging.filter, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = WardenConfig::from_toml_str("").unwrap();
        assert_eq!(config, WardenConfig::default());
    }

    #[test]
    fn test_parse_all_sections() {
        let config = WardenConfig::from_toml_str(
            r#"
            [service]
            timeout = "45s"

            [poll]
            hint_floor = "1s"
            max_interval = "250ms"

            [filter]
            page_size = 4096

            [attach_policy]
            key = 'SOFTWARE\Warden'
            value = "Allowed"

            [logging]
            filter = "warden=debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.service.timeout, Duration::from_secs(45));
        assert_eq!(config.poll.hint_floor, Duration::from_secs(1));
        assert_eq!(config.poll.max_interval, Duration::from_millis(250));
        assert_eq!(config.filter.page_size, 4096);
        assert_eq!(config.attach_policy.key, r"SOFTWARE\Warden");
        assert_eq!(config.attach_policy.value, "Allowed");
        assert_eq!(config.logging.filter, "warden=debug");
    }

    #[test]
    fn test_validate_rejects_small_page() {
        let err = WardenConfig::from_toml_str("[filter]\npage_size = 15\n").unwrap_err();
        assert!(matches!(err, WardenError::Config(_)));
        assert!(WardenConfig::from_toml_str("[filter]\npage_size = 16\n").is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let err = WardenConfig::from_toml_str("[poll]\nmax_interval = \"0s\"\n").unwrap_err();
        assert!(matches!(err, WardenError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_empty_location() {
        let location = AttachPolicyLocation {
            key: "  ".to_string(),
            ..Default::default()
        };
        assert!(location.validate().is_err());

        let location = AttachPolicyLocation {
            value: String::new(),
            ..Default::default()
        };
        assert!(location.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_os_allowed_filters_value() {
        let err = WardenConfig::from_toml_str(
            "[attach_policy]\nkey = 'SYSTEM\\CurrentControlSet\\Control\\FilterManager'\nvalue = \"DevDriveAllowedFilters\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, WardenError::Config(_)));

        let location = AttachPolicyLocation {
            value: "devdriveallowedfilters".to_string(),
            ..Default::default()
        };
        assert!(location.validate().is_err());
        assert!(!DEFAULT_POLICY_VALUE.eq_ignore_ascii_case(OS_ALLOWED_FILTERS_VALUE));
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = WardenConfig::from_toml_str("[service]\ntimeout = \"soon\"\n").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn test_poll_interval_default_is_capped() {
        let poll = PollPolicy::default();
        assert_eq!(poll.interval_for(Duration::ZERO), Duration::from_millis(500));
        assert_eq!(
            poll.interval_for(Duration::from_secs(120)),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_poll_interval_follows_hint_between_bounds() {
        let poll = PollPolicy {
            hint_floor: Duration::from_millis(10),
            max_interval: Duration::from_millis(100),
        };
        assert_eq!(poll.interval_for(Duration::ZERO), Duration::from_millis(10));
        assert_eq!(
            poll.interval_for(Duration::from_millis(500)),
            Duration::from_millis(50)
        );
        assert_eq!(
            poll.interval_for(Duration::from_secs(5)),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\ntimeout = \"2m\"").unwrap();

        let config = WardenConfig::load(file.path()).unwrap();
        assert_eq!(config.service.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = WardenConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = WardenConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed = WardenConfig::from_toml_str(&text).unwrap();
        assert_eq!(config, parsed);
    }
}
