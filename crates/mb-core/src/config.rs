//! Configuration management
//!
//! Configuration is loaded with the following precedence:
//! 1. Environment variables
//! 2. mail-bridge.toml config file
//! 3. Default values
//!
//! Inside the config file, `${VAR_NAME}` expands to the environment variable.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Mail account configuration (one account drives both IMAP and SMTP)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Account address, used both for login and as the From header
    pub address: String,

    /// Account password (app password for Gmail)
    #[serde(skip_serializing)]
    pub password: String,

    /// IMAP server hostname
    #[serde(default = "default_imap_host")]
    pub imap_host: String,

    /// IMAP server port (993 = implicit TLS)
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,

    /// SMTP server hostname
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// SMTP server port (587 = STARTTLS)
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Watched mailbox folder
    #[serde(default = "default_folder")]
    pub folder: String,
}

/// Webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// URL that receives inbound email events as JSON POSTs
    pub url: String,
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port for the HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

/// Main configuration for mail-bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Mail account settings
    pub email: EmailConfig,

    /// Webhook settings
    pub webhook: WebhookConfig,

    /// HTTP API settings
    #[serde(default)]
    pub api: ApiConfig,
}

fn default_imap_host() -> String {
    "imap.gmail.com".to_string()
}

fn default_imap_port() -> u16 {
    993
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_folder() -> String {
    "INBOX".to_string()
}

fn default_api_port() -> u16 {
    3000
}

impl Config {
    /// Expand `${VAR_NAME}` references in config file content.
    ///
    /// Unknown variables expand to the empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // consume '{'

                let mut var_name = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(chars.next().unwrap());
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file.
    ///
    /// `${VAR_NAME}` inside the file is replaced with the environment value.
    /// Environment variables still override the file afterwards.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let toml_content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let expanded_content = Self::expand_env_vars(&toml_content);

        let toml_config: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        let mut cfg = Self::from_toml_config(toml_config)?;
        cfg.apply_env_overrides();
        cfg.validate()?;

        Ok(cfg)
    }

    /// Load configuration from the default locations.
    ///
    /// Tries `./mail-bridge.toml` first, then falls back to environment
    /// variables only.
    pub fn load() -> crate::Result<Self> {
        if Path::new("mail-bridge.toml").exists() {
            return Self::from_toml_file("mail-bridge.toml");
        }

        Self::from_env()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> crate::Result<Self> {
        let address = std::env::var("EMAIL_ADDRESS")
            .map_err(|_| Error::Config("EMAIL_ADDRESS not set".to_string()))?;
        let password = std::env::var("EMAIL_PASSWORD")
            .map_err(|_| Error::Config("EMAIL_PASSWORD not set".to_string()))?;
        let webhook_url = std::env::var("WEBHOOK_URL")
            .map_err(|_| Error::Config("WEBHOOK_URL not set".to_string()))?;

        let mut cfg = Config {
            email: EmailConfig {
                address,
                password,
                imap_host: default_imap_host(),
                imap_port: default_imap_port(),
                smtp_host: default_smtp_host(),
                smtp_port: default_smtp_port(),
                folder: default_folder(),
            },
            webhook: WebhookConfig { url: webhook_url },
            api: ApiConfig::default(),
        };
        cfg.apply_env_overrides();
        cfg.validate()?;

        Ok(cfg)
    }

    /// Overwrite settings from environment variables
    fn apply_env_overrides(&mut self) {
        if let Ok(address) = std::env::var("EMAIL_ADDRESS") {
            if !address.is_empty() {
                self.email.address = address;
            }
        }
        if let Ok(password) = std::env::var("EMAIL_PASSWORD") {
            if !password.is_empty() {
                self.email.password = password;
            }
        }
        if let Ok(host) = std::env::var("IMAP_HOST") {
            if !host.is_empty() {
                self.email.imap_host = host;
            }
        }
        if let Ok(port) = std::env::var("IMAP_PORT") {
            if let Ok(p) = port.parse() {
                self.email.imap_port = p;
            }
        }
        if let Ok(host) = std::env::var("SMTP_HOST") {
            if !host.is_empty() {
                self.email.smtp_host = host;
            }
        }
        if let Ok(port) = std::env::var("SMTP_PORT") {
            if let Ok(p) = port.parse() {
                self.email.smtp_port = p;
            }
        }
        if let Ok(folder) = std::env::var("IMAP_FOLDER") {
            if !folder.is_empty() {
                self.email.folder = folder;
            }
        }
        if let Ok(url) = std::env::var("WEBHOOK_URL") {
            if !url.is_empty() {
                self.webhook.url = url;
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }
    }

    /// Build a Config from the parsed TOML structure
    fn from_toml_config(toml: TomlConfig) -> crate::Result<Self> {
        let email = toml.email.unwrap_or_default();
        let email_config = EmailConfig {
            address: email.address.unwrap_or_default(),
            password: email.password.unwrap_or_default(),
            imap_host: email.imap_host.unwrap_or_else(default_imap_host),
            imap_port: email.imap_port.unwrap_or_else(default_imap_port),
            smtp_host: email.smtp_host.unwrap_or_else(default_smtp_host),
            smtp_port: email.smtp_port.unwrap_or_else(default_smtp_port),
            folder: email.folder.unwrap_or_else(default_folder),
        };

        let webhook = toml.webhook.unwrap_or_default();
        let webhook_config = WebhookConfig {
            url: webhook.url.unwrap_or_default(),
        };

        let api = toml.api.unwrap_or_default();
        let api_config = ApiConfig {
            port: api.port.unwrap_or_else(default_api_port),
        };

        Ok(Config {
            email: email_config,
            webhook: webhook_config,
            api: api_config,
        })
    }

    /// Presence checks for the values the bridge cannot run without
    fn validate(&self) -> crate::Result<()> {
        if self.email.address.is_empty() {
            return Err(Error::Config("email address not set".to_string()));
        }
        if self.email.password.is_empty() {
            return Err(Error::Config("email password not set".to_string()));
        }
        if self.webhook.url.is_empty() {
            return Err(Error::Config("webhook URL not set".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// TOML structure definitions (file parsing only)
// ============================================================================

/// Top-level structure of mail-bridge.toml
#[derive(Debug, Deserialize)]
struct TomlConfig {
    email: Option<TomlEmailConfig>,
    webhook: Option<TomlWebhookConfig>,
    api: Option<TomlApiConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlEmailConfig {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    imap_host: Option<String>,
    #[serde(default)]
    imap_port: Option<u16>,
    #[serde(default)]
    smtp_host: Option<String>,
    #[serde(default)]
    smtp_port: Option<u16>,
    #[serde(default)]
    folder: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlWebhookConfig {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlApiConfig {
    #[serde(default)]
    port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_default() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("MAIL_BRIDGE_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${MAIL_BRIDGE_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        // Missing variables expand to nothing
        let result = Config::expand_env_vars("prefix_${NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("MAIL_BRIDGE_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        let result = Config::expand_env_vars("no_vars_here");
        assert_eq!(result, "no_vars_here");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[email]
address = "bridge@example.com"
password = "secret"
imap_host = "imap.example.com"
smtp_port = 465
folder = "Support"

[webhook]
url = "https://automation.example.com/hook"

[api]
port = 8080
"#;

        let toml_config: TomlConfig = toml::from_str(toml_content).unwrap();
        let config = Config::from_toml_config(toml_config).unwrap();

        assert_eq!(config.email.address, "bridge@example.com");
        assert_eq!(config.email.password, "secret");
        assert_eq!(config.email.imap_host, "imap.example.com");
        // Unset fields keep their defaults
        assert_eq!(config.email.imap_port, 993);
        assert_eq!(config.email.smtp_host, "smtp.gmail.com");
        assert_eq!(config.email.smtp_port, 465);
        assert_eq!(config.email.folder, "Support");
        assert_eq!(config.webhook.url, "https://automation.example.com/hook");
        assert_eq!(config.api.port, 8080);
    }

    #[test]
    fn test_env_overrides_file_values() {
        unsafe {
            std::env::set_var("SMTP_PORT", "2525");
            std::env::set_var("WEBHOOK_URL", "https://env.example.com/hook");
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mail-bridge.toml");
        std::fs::write(
            &path,
            r#"
[email]
address = "bridge@example.com"
password = "secret"
smtp_port = 465

[webhook]
url = "https://file.example.com/hook"
"#,
        )
        .unwrap();

        let config = Config::from_toml_file(&path).unwrap();

        // Environment wins over the file
        assert_eq!(config.email.smtp_port, 2525);
        assert_eq!(config.webhook.url, "https://env.example.com/hook");
        // File values without an override survive
        assert_eq!(config.email.address, "bridge@example.com");

        unsafe {
            std::env::remove_var("SMTP_PORT");
            std::env::remove_var("WEBHOOK_URL");
        }
    }

    #[test]
    fn test_validate_rejects_missing_webhook() {
        let config = Config {
            email: EmailConfig {
                address: "bridge@example.com".to_string(),
                password: "secret".to_string(),
                imap_host: default_imap_host(),
                imap_port: default_imap_port(),
                smtp_host: default_smtp_host(),
                smtp_port: default_smtp_port(),
                folder: default_folder(),
            },
            webhook: WebhookConfig { url: String::new() },
            api: ApiConfig::default(),
        };

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
