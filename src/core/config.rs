//! # Configuration Module
//!
//! Configuration is assembled in three steps:
//! 1. Built-in defaults, or a YAML file when `GATEWAY_CONFIG_PATH` is set
//! 2. Environment variable overrides (`HOST`, `PORT`, `CLERK_*`, `SUPABASE_*`, ...)
//! 3. Validation, with endpoint normalization for the RPC services
//!
//! The environment variable names match what the deployment manifests already
//! provide, so the gateway runs without a config file in most environments.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::core::error::{GatewayError, GatewayResult};

/// Main gateway configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listen address and route layout
    pub server: ServerConfig,

    /// Session token verification settings
    pub identity: IdentityConfig,

    /// Remote analytics and ML services
    pub services: ServicesConfig,

    /// Hosted database REST endpoint
    pub database: DatabaseConfig,

    /// Logging and metrics
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Also serve every `/api/*` route under `/v1/*`
    pub versioned_routes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            versioned_routes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Identity provider secret key; authenticates the JWKS request when no public key is set
    pub secret_key: Option<String>,
    /// Identity provider backend API base URL, serving `/v1/jwks`
    pub api_url: String,
    /// Publishable key; the expected token issuer is derived from it
    pub publishable_key: Option<String>,
    /// PEM-encoded RSA public key for RS256 session tokens
    pub jwt_public_key: Option<String>,
    /// Accepted values for the `azp` claim; empty accepts any
    pub authorized_parties: Vec<String>,
    /// Allowed clock skew for `exp`/`nbf`
    #[serde(with = "humantime_serde")]
    pub clock_skew: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_url: "https://api.clerk.com".to_string(),
            publishable_key: None,
            jwt_public_key: None,
            authorized_parties: Vec::new(),
            clock_skew: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub analytics: RpcServiceConfig,
    pub ml: RpcServiceConfig,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            analytics: RpcServiceConfig::new(
                "http://analytics-service.default.svc.cluster.local:50051",
                "AnalyticsService",
            ),
            ml: RpcServiceConfig::new("http://ml-service.default.svc.cluster.local:50051", "MLService"),
        }
    }
}

/// One remote gRPC service.
///
/// Fields left out of a config file stay empty here and are filled from the
/// matching service's defaults during [`GatewayConfig::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcServiceConfig {
    /// Endpoint URI; a bare `host:port` is treated as plaintext HTTP/2
    pub address: String,
    /// Fully-qualified protobuf service name used to build method paths
    pub service_name: String,
    /// Only bounds connection establishment; calls themselves carry no deadline
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
}

impl RpcServiceConfig {
    pub fn new(address: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            service_name: service_name.into(),
            connect_timeout: None,
        }
    }

    fn fill_missing(&mut self, defaults: &RpcServiceConfig) {
        if self.address.trim().is_empty() {
            self.address = defaults.address.clone();
        }
        if self.service_name.trim().is_empty() {
            self.service_name = defaults.service_name.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// REST base URL; when unset reports are kept in memory
    pub url: Option<String>,
    pub key: Option<String>,
    pub reports_table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            reports_table: "reports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub logging: LogConfig,
    /// Install the Prometheus recorder and expose `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging: LogConfig::default(),
            metrics_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "symptom_gateway=info,tower_http=info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl GatewayConfig {
    /// Load configuration from a YAML file, then apply environment overrides
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::config(format!("Failed to read config file: {}", e)))?;

        let mut config: GatewayConfig = serde_yaml::from_str(&content)?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults and the process environment only
    pub fn from_env() -> GatewayResult<Self> {
        let mut config = GatewayConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> GatewayResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, so tests don't touch the real environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> GatewayResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid PORT: {}", e)))?;
        }

        // Identity provider keys
        if let Some(key) = lookup("CLERK_SECRET_KEY") {
            self.identity.secret_key = Some(key);
        }
        if let Some(key) = lookup("CLERK_PUBLISHABLE_KEY") {
            self.identity.publishable_key = Some(key);
        }
        if let Some(url) = lookup("CLERK_API_URL") {
            self.identity.api_url = url;
        }
        if let Some(key) = lookup("CLERK_JWT_KEY") {
            self.identity.jwt_public_key = Some(key);
        }
        if let Some(parties) = lookup("CLERK_AUTHORIZED_PARTIES") {
            self.identity.authorized_parties = parties
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }

        // Remote services
        if let Some(address) = lookup("ANALYTICS_SERVICE_ADDRESS") {
            self.services.analytics.address = address;
        }
        if let Some(address) = lookup("ML_SERVICE_ADDRESS") {
            self.services.ml.address = address;
        }

        // Database
        if let Some(url) = lookup("SUPABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_KEY") {
            self.database.key = Some(key);
        }

        // Observability
        if let Some(level) = lookup("GATEWAY_LOG_LEVEL") {
            self.observability.logging.level = level;
        }
        if let Some(format) = lookup("GATEWAY_LOG_FORMAT") {
            self.observability.logging.format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(GatewayError::config(format!(
                        "Invalid GATEWAY_LOG_FORMAT: {}",
                        other
                    )))
                }
            };
        }
        if let Some(enabled) = lookup("GATEWAY_METRICS_ENABLED") {
            self.observability.metrics_enabled = enabled
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid GATEWAY_METRICS_ENABLED: {}", e)))?;
        }

        Ok(())
    }

    /// Validate the configuration and normalize RPC endpoints
    pub fn validate(&mut self) -> GatewayResult<()> {
        self.bind_addr()?;

        if self.identity.secret_key.is_none() && self.identity.jwt_public_key.is_none() {
            return Err(GatewayError::config(
                "Either CLERK_SECRET_KEY or CLERK_JWT_KEY must be set to verify sessions",
            ));
        }

        let defaults = ServicesConfig::default();
        self.services.analytics.fill_missing(&defaults.analytics);
        self.services.ml.fill_missing(&defaults.ml);
        for service in [&mut self.services.analytics, &mut self.services.ml] {
            service.address = normalize_endpoint(&service.address);
        }

        url::Url::parse(&self.identity.api_url)
            .map_err(|e| GatewayError::config(format!("Invalid CLERK_API_URL: {}", e)))?;

        if let Some(url) = &self.database.url {
            url::Url::parse(url)
                .map_err(|e| GatewayError::config(format!("Invalid SUPABASE_URL: {}", e)))?;
            if self.database.key.is_none() {
                return Err(GatewayError::config("SUPABASE_KEY is required when SUPABASE_URL is set"));
            }
        }

        Ok(())
    }

    /// Socket address the HTTP listener binds to
    pub fn bind_addr(&self) -> GatewayResult<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| GatewayError::config(format!("Invalid bind address: {}", e)))
    }
}

/// Prefix bare `host:port` endpoints with `http://`
fn normalize_endpoint(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}
