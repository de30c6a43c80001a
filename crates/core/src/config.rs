use serde::Deserialize;

use crate::error::{WreckshopError, WreckshopResult};

/// Environment variable prefix, e.g. `WRECKSHOP__API__HTTP_PORT=4000`.
pub const ENV_PREFIX: &str = "WRECKSHOP";

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `WRECKSHOP__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub journey: JourneyConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Prefix the journey routes are mounted under.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_cors_permissive")]
    pub cors_permissive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_json")]
    pub json: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

// Default functions
fn default_service_name() -> String {
    "wreckshop".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    4000
}
fn default_path_prefix() -> String {
    "/api".to_string()
}
fn default_cors_permissive() -> bool {
    true
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_log_json() -> bool {
    true
}
fn default_log_filter() -> String {
    "wreckshop=info,wreckshop_api=info,wreckshop_journey=info,tower_http=info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            path_prefix: default_path_prefix(),
            cors_permissive: default_cors_permissive(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: default_log_json(),
            filter: default_log_filter(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api: ApiConfig::default(),
            journey: JourneyConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─── Journey Config ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Deserialize)]
pub struct JourneyConfig {
    /// Upper bound on the number of journeys returned by a list call.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
    /// Audit entries kept per journey; the oldest are dropped past this.
    /// The trail lives in memory and outlives deleted journeys.
    #[serde(default = "default_audit_limit")]
    pub audit_limit: usize,
    #[serde(default)]
    pub seed_demo: bool,
}

fn default_list_limit() -> usize { 200 }
fn default_max_steps() -> usize { 500 }
fn default_max_tags() -> usize { 50 }
fn default_max_name_len() -> usize { 256 }
fn default_audit_limit() -> usize { 1000 }

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            list_limit: default_list_limit(),
            max_steps: default_max_steps(),
            max_tags: default_max_tags(),
            max_name_len: default_max_name_len(),
            audit_limit: default_audit_limit(),
            seed_demo: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file and environment variables.
    /// Environment variables take precedence over the file.
    pub fn load(path: Option<&str>) -> WreckshopResult<Self> {
        let file = path.unwrap_or("wreckshop.toml");
        let builder = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_sources(builder)
    }

    /// Parse configuration from a TOML document. Missing keys take defaults.
    pub fn from_toml_str(toml: &str) -> WreckshopResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Self::from_sources(builder)
    }

    fn from_sources(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> WreckshopResult<Self> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> WreckshopResult<()> {
        if self.api.http_port == 0 {
            return Err(WreckshopError::Config("api.http_port must be non-zero".into()));
        }
        if !self.api.path_prefix.is_empty() && !self.api.path_prefix.starts_with('/') {
            return Err(WreckshopError::Config(format!(
                "api.path_prefix must start with '/', got {:?}",
                self.api.path_prefix
            )));
        }
        if self.journey.list_limit == 0 {
            return Err(WreckshopError::Config("journey.list_limit must be positive".into()));
        }
        if self.journey.max_steps == 0 {
            return Err(WreckshopError::Config("journey.max_steps must be positive".into()));
        }
        if self.journey.max_name_len == 0 {
            return Err(WreckshopError::Config("journey.max_name_len must be positive".into()));
        }
        if self.journey.audit_limit == 0 {
            return Err(WreckshopError::Config("journey.audit_limit must be positive".into()));
        }
        if self.metrics.enabled && self.metrics.port == self.api.http_port {
            return Err(WreckshopError::Config(format!(
                "metrics.port {} collides with api.http_port",
                self.metrics.port
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_backend() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 4000);
        assert_eq!(config.api.path_prefix, "/api");
        assert_eq!(config.journey.list_limit, 200);
        assert_eq!(config.journey.audit_limit, 1000);
        assert!(!config.journey.seed_demo);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let config = AppConfig::from_toml_str(
            r#"
            service_name = "wreckshop-staging"

            [api]
            http_port = 8088

            [journey]
            list_limit = 50
            seed_demo = true
            "#,
        )
        .unwrap();

        assert_eq!(config.service_name, "wreckshop-staging");
        assert_eq!(config.api.http_port, 8088);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.journey.list_limit, 50);
        assert_eq!(config.journey.max_steps, 500);
        assert!(config.journey.seed_demo);
    }

    #[test]
    fn zero_list_limit_is_rejected() {
        let err = AppConfig::from_toml_str("[journey]\nlist_limit = 0\n").unwrap_err();
        assert!(matches!(err, WreckshopError::Config(_)));
    }

    #[test]
    fn metrics_port_must_differ_from_http_port() {
        let mut config = AppConfig::default();
        config.metrics.port = config.api.http_port;
        assert!(config.validate().is_err());

        config.metrics.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn prefix_without_leading_slash_is_rejected() {
        let err = AppConfig::from_toml_str("[api]\npath_prefix = \"api\"\n").unwrap_err();
        assert!(err.to_string().contains("path_prefix"));
    }
}
