use crate::locale::Locale;
use crate::readiness::ReadinessRule;
use crate::view::ViewOptions;
use crate::zone::ViewerZone;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8090;
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_DISPLAY_TIMEZONE: &str = "UTC";
pub const DEFAULT_RENDER_WAIT_SECS: u64 = 30;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub backend: Option<BackendSection>,
    #[serde(default)]
    pub view: Option<ViewSection>,
    #[serde(default)]
    pub basic_auth: Option<BasicAuthSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8090)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSection {
    /// Base URL serving /api/events and /api/battery
    pub base_url: Option<String>,
    /// Per-request timeout; unset or 0 keeps the transport defaults
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewSection {
    pub locale: Option<String>,
    /// IANA zone or `+HH:MM`; detected from the host when unset
    pub timezone: Option<String>,
    pub display_timezone: Option<String>,
    pub readiness: Option<ReadinessRule>,
    /// Periodic page reload; unset or 0 disables it
    pub remount_interval_secs: Option<u64>,
    /// How long `/calendar` holds a navigation for readiness (default: 30)
    pub render_wait_secs: Option<u64>,
}

#[derive(Deserialize, Clone)]
pub struct BasicAuthSection {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for BasicAuthSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthSection")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Fully resolved settings. Every default has been applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub log_level: tracing::Level,
    pub port: u16,
    pub backend_url: String,
    pub request_timeout: Option<Duration>,
    pub view: ViewOptions,
    pub remount_interval: Option<Duration>,
    pub basic_auth: Option<BasicAuth>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

fn positive_secs(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|secs| *secs > 0).map(Duration::from_secs)
}

impl Config {
    pub fn log_level(&self) -> Result<tracing::Level, ConfigError> {
        self.logging
            .level
            .trim()
            .parse::<tracing::Level>()
            .map_err(|_| ConfigError::Invalid(format!("log level {:?}", self.logging.level)))
    }

    /// Resolves every optional section into [`Settings`]. An unset
    /// `[view] timezone` is detected from the host.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let log_level = self.log_level()?;

        let backend_url = self
            .backend
            .as_ref()
            .and_then(|b| b.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "backend base_url must be http(s): {backend_url}"
            )));
        }

        let view = self.view.as_ref();
        let locale_tag = view.and_then(|v| v.locale.as_deref());
        let default_locale = Locale::resolve(locale_tag, Locale::DEFAULT);
        if let Some(tag) = locale_tag
            && Locale::parse(tag).is_none()
        {
            warn!(tag, fallback = default_locale.tag(), "Unsupported locale, using default");
        }

        let zone = match view.and_then(|v| v.timezone.as_deref()) {
            Some(value) => ViewerZone::parse(value)
                .ok_or_else(|| ConfigError::Invalid(format!("view timezone {value:?}")))?,
            None => ViewerZone::detect(),
        };

        let display_timezone = view
            .and_then(|v| v.display_timezone.clone())
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DISPLAY_TIMEZONE.to_string());

        let basic_auth = self.basic_auth.as_ref().and_then(|section| {
            match (section.username.as_deref(), section.password.as_deref()) {
                (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                    Some(BasicAuth {
                        username: username.to_string(),
                        password: password.to_string(),
                    })
                }
                _ => None,
            }
        });

        Ok(Settings {
            app_name: self.app.name.clone(),
            log_level,
            port: self
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(DEFAULT_SERVER_PORT),
            backend_url,
            request_timeout: positive_secs(
                self.backend.as_ref().and_then(|b| b.request_timeout_secs),
            ),
            view: ViewOptions {
                default_locale,
                zone,
                display_timezone,
                readiness: view.and_then(|v| v.readiness).unwrap_or_default(),
                render_wait: Duration::from_secs(
                    view.and_then(|v| v.render_wait_secs)
                        .unwrap_or(DEFAULT_RENDER_WAIT_SECS),
                ),
            },
            remount_interval: positive_secs(view.and_then(|v| v.remount_interval_secs)),
            basic_auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::macros::offset;

    fn write_temp(name: &str, contents: &str) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = std::env::temp_dir().join(format!("epdcal-view-{name}-{unique}.toml"));
        fs::write(&path, contents)?;
        Ok(path)
    }

    #[test]
    fn default_config_resolves() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_default()?;
        let settings = config.resolve()?;
        assert_eq!(settings.port, 8090);
        assert_eq!(settings.view.readiness, ReadinessRule::AllSources);
        assert_eq!(settings.view.default_locale, Locale::En);
        Ok(())
    }

    #[test]
    fn minimal_config_gets_every_default() -> Result<(), Box<dyn std::error::Error>> {
        let path = write_temp(
            "minimal",
            r#"
[app]
name = "epdcal-view"

[logging]
level = "info"

[view]
timezone = "+09:00"
"#,
        )?;
        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);
        let settings = result?.resolve()?;

        assert_eq!(settings.port, DEFAULT_SERVER_PORT);
        assert_eq!(settings.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(settings.request_timeout, None);
        assert_eq!(settings.remount_interval, None);
        assert_eq!(settings.view.zone, ViewerZone::Fixed(offset!(+9)));
        assert_eq!(
            settings.view.render_wait,
            Duration::from_secs(DEFAULT_RENDER_WAIT_SECS)
        );
        assert_eq!(settings.view.display_timezone, DEFAULT_DISPLAY_TIMEZONE);
        assert!(settings.basic_auth.is_none());
        Ok(())
    }

    #[test]
    fn full_config_is_applied() -> Result<(), Box<dyn std::error::Error>> {
        let path = write_temp(
            "full",
            r#"
[app]
name = "epdcal-view"

[logging]
level = "debug"

[server]
port = 9000

[backend]
base_url = "http://pi.local:8080"
request_timeout_secs = 10

[view]
locale = "ko-KR"
timezone = "America/New_York"
render_wait_secs = 5
display_timezone = "Asia/Seoul"
readiness = "events_only"
remount_interval_secs = 900

[basic_auth]
username = "admin"
password = "secret"
"#,
        )?;
        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);
        let settings = result?.resolve()?;

        assert_eq!(settings.log_level, tracing::Level::DEBUG);
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(10)));
        assert_eq!(settings.view.default_locale, Locale::Ko);
        assert_eq!(
            settings.view.zone,
            ViewerZone::Named(chrono_tz::America::New_York)
        );
        assert_eq!(settings.view.render_wait, Duration::from_secs(5));
        assert_eq!(settings.view.display_timezone, "Asia/Seoul");
        assert_eq!(settings.view.readiness, ReadinessRule::EventsOnly);
        assert_eq!(settings.remount_interval, Some(Duration::from_secs(900)));
        assert_eq!(
            settings.basic_auth.map(|auth| auth.username),
            Some("admin".to_string())
        );
        Ok(())
    }

    #[test]
    fn empty_credentials_disable_basic_auth() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(
            r#"
[app]
name = "epdcal-view"

[logging]
level = "info"

[view]
timezone = "UTC"

[basic_auth]
username = "admin"
password = ""
"#,
        )?;
        assert!(config.resolve()?.basic_auth.is_none());
        Ok(())
    }

    #[test]
    fn unknown_locale_falls_back_to_default() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(
            r#"
[app]
name = "epdcal-view"

[logging]
level = "info"

[view]
locale = "fr"
timezone = "Z"
"#,
        )?;
        assert_eq!(config.resolve()?.view.default_locale, Locale::En);
        Ok(())
    }

    #[test]
    fn unknown_timezone_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(
            r#"
[app]
name = "epdcal-view"

[logging]
level = "info"

[view]
timezone = "Mars/Olympus"
"#,
        )?;
        assert!(matches!(config.resolve(), Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn invalid_log_level_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(
            r#"
[app]
name = "epdcal-view"

[logging]
level = "loud"
"#,
        )?;
        assert!(matches!(config.resolve(), Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn unknown_readiness_rule_is_a_parse_error() {
        let result: Result<Config, _> = toml::from_str(
            r#"
[app]
name = "epdcal-view"

[logging]
level = "info"

[view]
readiness = "whenever"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_config_file_returns_read_error() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("epdcal-view-missing-{unique}.toml"));

        let result = load_from_path(&path);

        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn invalid_toml_returns_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let path = write_temp("invalid", "not = [valid")?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        Ok(())
    }

    #[test]
    fn debug_output_redacts_password() {
        let auth = BasicAuth {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{auth:?}").contains("hunter2"));
    }
}
