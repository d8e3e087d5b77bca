use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub identifier: IdentifierConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("racdesk.db")
}

/// Ticket identifier format and allocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentifierConfig {
    /// Fixed textual prefix (e.g. "RAC" gives RAC0001).
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Minimum number of digits in the numeric suffix.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Insert attempts before giving up with AllocationExhausted.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            width: default_width(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_prefix() -> String {
    "RAC".to_string()
}

fn default_width() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    8
}

/// Conversational intake tokens.
///
/// All comparisons against these tokens are case-insensitive.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntakeConfig {
    #[serde(default = "default_trigger_phrase")]
    pub trigger_phrase: String,
    #[serde(default = "default_affirmative")]
    pub affirmative: String,
    #[serde(default = "default_negative")]
    pub negative: String,
    /// Abandons the current session.
    #[serde(default = "default_cancel_phrase")]
    pub cancel_phrase: String,
    /// Prefix of the history search command ("consultar <termo>").
    #[serde(default = "default_search_prefix")]
    pub search_prefix: String,
    /// Category assigned to tickets created through the chat.
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "default_search_limit")]
    pub search_result_limit: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            trigger_phrase: default_trigger_phrase(),
            affirmative: default_affirmative(),
            negative: default_negative(),
            cancel_phrase: default_cancel_phrase(),
            search_prefix: default_search_prefix(),
            default_category: default_category(),
            search_result_limit: default_search_limit(),
        }
    }
}

fn default_trigger_phrase() -> String {
    "novo chamado".to_string()
}

fn default_affirmative() -> String {
    "sim".to_string()
}

fn default_negative() -> String {
    "não".to_string()
}

fn default_cancel_phrase() -> String {
    "cancelar".to_string()
}

fn default_search_prefix() -> String {
    "consultar".to_string()
}

fn default_category() -> String {
    "Suporte Técnico".to_string()
}

fn default_search_limit() -> usize {
    5
}

/// Report generation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportsConfig {
    /// Directory where rendered artifacts are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub render_timeout_secs: u64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            render_timeout_secs: default_timeout_secs(),
        }
    }
}

impl ReportsConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("relatorios")
}

fn default_timeout_secs() -> u64 {
    30
}

/// Report delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// Timeout applied to every channel attempt.
    #[serde(default = "default_timeout_secs")]
    pub attempt_timeout_secs: u64,
    /// Email relay (channel disabled when absent).
    #[serde(default)]
    pub email: Option<EmailRelayConfig>,
    /// Messaging gateway used as the alternate channel (disabled when absent).
    #[serde(default)]
    pub messaging: Option<MessagingGatewayConfig>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_timeout_secs(),
            email: None,
            messaging: None,
        }
    }
}

impl DeliveryConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

/// HTTP mail relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailRelayConfig {
    /// Relay endpoint accepting multipart messages.
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Send a copy to the project manager when one is registered.
    #[serde(default = "default_true")]
    pub copy_project_manager: bool,
}

fn default_from_name() -> String {
    "Sistema de Chamados".to_string()
}

fn default_true() -> bool {
    true
}

/// HTTP messaging gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagingGatewayConfig {
    pub url: String,
    #[serde(default)]
    pub api_token: String,
}

/// Background sweep scheduling.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// When disabled, sweeps only run on request through the API.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_report_interval")]
    pub report_sweep_interval_ms: u64,
    #[serde(default = "default_delivery_interval")]
    pub delivery_sweep_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            report_sweep_interval_ms: default_report_interval(),
            delivery_sweep_interval_ms: default_delivery_interval(),
        }
    }
}

fn default_report_interval() -> u64 {
    60_000
}

fn default_delivery_interval() -> u64 {
    60_000
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identifier: IdentifierConfig,
    pub intake: IntakeConfig,
    pub reports: ReportsConfig,
    pub delivery: SanitizedDeliveryConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDeliveryConfig {
    pub attempt_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<SanitizedEmailRelayConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messaging: Option<SanitizedMessagingGatewayConfig>,
}

/// Email relay config with the API key hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEmailRelayConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub from_address: String,
    pub copy_project_manager: bool,
}

/// Messaging gateway config with the token hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMessagingGatewayConfig {
    pub url: String,
    pub api_token_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            identifier: config.identifier.clone(),
            intake: config.intake.clone(),
            reports: config.reports.clone(),
            delivery: SanitizedDeliveryConfig {
                attempt_timeout_secs: config.delivery.attempt_timeout_secs,
                email: config
                    .delivery
                    .email
                    .as_ref()
                    .map(|e| SanitizedEmailRelayConfig {
                        url: e.url.clone(),
                        api_key_configured: !e.api_key.is_empty(),
                        from_address: e.from_address.clone(),
                        copy_project_manager: e.copy_project_manager,
                    }),
                messaging: config.delivery.messaging.as_ref().map(|m| {
                    SanitizedMessagingGatewayConfig {
                        url: m.url.clone(),
                        api_token_configured: !m.api_token.is_empty(),
                    }
                }),
            },
            scheduler: config.scheduler.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "racdesk.db");
        assert_eq!(config.identifier.max_attempts, 8);
        assert_eq!(config.intake.affirmative, "sim");
        assert_eq!(config.intake.negative, "não");
        assert_eq!(config.reports.render_timeout(), Duration::from_secs(30));
        assert!(config.delivery.email.is_none());
        assert!(!config.scheduler.enabled);
    }

    #[test]
    fn test_deserialize_delivery_channels() {
        let toml = r#"
[delivery]
attempt_timeout_secs = 10

[delivery.email]
url = "https://relay.example.com/send"
api_key = "secret"
from_address = "suporte@example.com"

[delivery.messaging]
url = "https://gateway.example.com/documents"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let email = config.delivery.email.as_ref().unwrap();
        assert_eq!(email.from_name, "Sistema de Chamados");
        assert!(email.copy_project_manager);
        assert_eq!(config.delivery.attempt_timeout(), Duration::from_secs(10));

        let messaging = config.delivery.messaging.as_ref().unwrap();
        assert!(messaging.api_token.is_empty());
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let mut config = Config::default();
        config.delivery.email = Some(EmailRelayConfig {
            url: "https://relay.example.com/send".to_string(),
            api_key: "secret-key".to_string(),
            from_address: "suporte@example.com".to_string(),
            from_name: default_from_name(),
            copy_project_manager: false,
        });
        config.delivery.messaging = Some(MessagingGatewayConfig {
            url: "https://gateway.example.com".to_string(),
            api_token: String::new(),
        });

        let sanitized = SanitizedConfig::from(&config);
        let email = sanitized.delivery.email.as_ref().unwrap();
        assert!(email.api_key_configured);
        assert!(!sanitized.delivery.messaging.as_ref().unwrap().api_token_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
