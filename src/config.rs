use config::{Config, ConfigError, Environment, File};
use lettre::Address;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub gmail: GmailConfig,
    pub credentials: Option<CredentialsConfig>,
    pub log_file: Option<String>,
    pub log_level: Option<String>,
    #[serde(default)]
    pub quiet: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GmailConfig {
    /// The authenticated Gmail address; forced as the from address when set
    pub from_google_email: Option<String>,
    /// Used only when a message has no from name of its own
    pub from_google_name: Option<String>,
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CredentialsConfig {
    pub access_token: Option<String>,
    pub api_base: Option<String>,
}

// Recipients are sent to one at a time unless configured otherwise
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;

impl GmailConfig {
    pub fn concurrency(&self) -> usize {
        self.max_concurrency
            .unwrap_or(DEFAULT_MAX_CONCURRENCY)
            .max(1)
    }
}

// Implement loading configuration
impl AppConfig {
    // Load config from defaults, then file (if exists), then environment variables
    pub fn new() -> Result<Self, ConfigError> {
        Self::configure_defaults()?
            .add_source(File::with_name("config").required(false))
            // e.g. APP_GMAIL__FROM_GOOGLE_EMAIL=... APP_CREDENTIALS__ACCESS_TOKEN=...
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize::<Self>()?
            .validate()
    }

    // Load config from a specific file path
    pub fn new_from_file(path: &str) -> Result<Self, ConfigError> {
        Self::configure_defaults()?
            .add_source(File::with_name(path).required(true))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize::<Self>()?
            .validate()
    }

    fn configure_defaults()
    -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder().set_default("quiet", false)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if let Some(email) = self.gmail.from_google_email.as_deref().map(str::trim) {
            if !email.is_empty() {
                email.parse::<Address>().map_err(|e| {
                    ConfigError::Message(format!("gmail.from_google_email {}: {}", email, e))
                })?;
            }
        }

        if self.gmail.max_concurrency == Some(0) {
            return Err(ConfigError::Message(
                "gmail.max_concurrency must be at least 1".to_string(),
            ));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn load(toml_str: &str) -> Result<AppConfig, ConfigError> {
        AppConfig::configure_defaults()
            .unwrap()
            .add_source(File::from_str(toml_str, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>()?
            .validate()
    }

    #[test]
    fn test_valid_config_deserialization() {
        let toml_str = r#"
            log_level = "debug"

            [gmail]
            from_google_email = "me@gmail.com"
            from_google_name = "Acme"
            max_concurrency = 4

            [credentials]
            access_token = "ya29.token"
            api_base = "http://127.0.0.1:8080"
        "#;

        let config = load(toml_str).unwrap();

        assert_eq!(config.gmail.from_google_email.as_deref(), Some("me@gmail.com"));
        assert_eq!(config.gmail.from_google_name.as_deref(), Some("Acme"));
        assert_eq!(config.gmail.concurrency(), 4);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(!config.quiet);

        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.access_token.as_deref(), Some("ya29.token"));
        assert_eq!(credentials.api_base.as_deref(), Some("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_default_values() {
        let config = load("").unwrap();

        assert!(config.gmail.from_google_email.is_none());
        assert!(config.gmail.from_google_name.is_none());
        assert_eq!(config.gmail.concurrency(), DEFAULT_MAX_CONCURRENCY);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_empty_from_email_is_allowed() {
        let toml_str = r#"
            [gmail]
            from_google_email = ""
        "#;
        assert!(load(toml_str).is_ok());
    }

    #[test]
    fn test_invalid_from_email() {
        let toml_str = r#"
            [gmail]
            from_google_email = "not an email"
        "#;

        let err = load(toml_str).unwrap_err();
        assert!(err.to_string().contains("from_google_email"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let toml_str = r#"
            [gmail]
            max_concurrency = 0
        "#;
        assert!(load(toml_str).is_err());
    }

    #[test]
    fn test_invalid_config_type() {
        let toml_str = r#"
            [gmail]
            from_google_name = ["not", "a", "string"]
        "#;

        assert!(load(toml_str).is_err());
    }
}
