use crate::access::evaluator::UnregisteredRoutePolicy;
use crate::models::feature::FeatureDescriptor;
use crate::models::subscription::{Plan, Subscription};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Longest plan accepted from configuration, about a century
pub const MAX_PLAN_DURATION_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    /// Extra or replacement feature descriptors, merged over the built-in catalogue
    #[serde(default)]
    pub features: Vec<FeatureDescriptor>,
    /// Role -> feature grants, each entry replacing the built-in grants of that role
    #[serde(default)]
    pub roles: HashMap<String, Vec<String>>,
    /// Plan catalogue; the built-in plans are used when empty
    #[serde(default)]
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub unix_socket: Option<PathBuf>,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Key required by session creation and metrics
    pub api_key: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl: i64,
    #[serde(default = "default_session_cleanup_interval")]
    pub session_cleanup_interval: u64,
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub unregistered_routes: UnregisteredRoutePolicy,
    /// Shown on denial pages when the guard is asked for a contact-admin action
    #[serde(default)]
    pub contact_admin: Option<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            unregistered_routes: UnregisteredRoutePolicy::Allow,
            contact_admin: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionSourceKind {
    #[default]
    Mock,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default)]
    pub source: SubscriptionSourceKind,
    pub data_endpoint: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_required_feature")]
    pub required_feature: String,
    #[serde(default)]
    pub mock_latency_ms: u64,
    /// Seed records for the mock source
    #[serde(default)]
    pub mock: Vec<Subscription>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            source: SubscriptionSourceKind::Mock,
            data_endpoint: None,
            api_key: None,
            required_feature: default_required_feature(),
            mock_latency_ms: 0,
            mock: Vec::new(),
        }
    }
}

// Default value functions
fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

fn default_session_ttl() -> i64 {
    28_800 // 8 hours
}

fn default_session_cleanup_interval() -> u64 {
    300 // 5 minutes
}

fn default_session_capacity() -> usize {
    10_000
}

fn default_required_feature() -> String {
    "practice_management".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate server config
        if self.server.port.is_none() && self.server.unix_socket.is_none() {
            bail!("Either port or unix_socket must be specified in server config");
        }

        if let Some(port) = self.server.port {
            if port == 0 {
                bail!("Server port must be greater than 0");
            }
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        // Validate auth config
        if self.auth.api_key.is_empty() {
            bail!("api_key must not be empty");
        }

        if self.auth.session_cleanup_interval == 0 {
            bail!("session_cleanup_interval must be greater than 0");
        }

        if self.auth.session_ttl <= self.auth.session_cleanup_interval as i64 {
            bail!(
                "session_ttl ({}) must be greater than session_cleanup_interval ({})",
                self.auth.session_ttl,
                self.auth.session_cleanup_interval
            );
        }

        if self.auth.session_capacity == 0 {
            bail!("session_capacity must be greater than 0");
        }

        // Validate subscription config
        if self.subscription.source == SubscriptionSourceKind::Remote {
            match (&self.subscription.data_endpoint, &self.subscription.api_key) {
                (Some(endpoint), Some(key)) if !endpoint.is_empty() && !key.is_empty() => {}
                _ => bail!("Remote subscription source requires data_endpoint and api_key"),
            }
        }

        if self.subscription.required_feature.trim().is_empty() {
            bail!("required_feature must not be empty");
        }

        // Validate catalogue
        let mut codes = HashSet::new();
        for feature in &self.features {
            if feature.code.as_str().trim().is_empty() {
                bail!("Feature code must not be empty");
            }
            if !codes.insert(feature.code.as_str()) {
                bail!("Duplicate feature code '{}'", feature.code);
            }
            if let Some(prefix) = feature
                .owned_route_prefixes
                .iter()
                .find(|prefix| !prefix.starts_with('/'))
            {
                bail!(
                    "Route prefix '{}' of feature '{}' must start with '/'",
                    prefix,
                    feature.code
                );
            }
        }

        let mut plan_names = HashSet::new();
        for plan in &self.plans {
            if plan.name.trim().is_empty() {
                bail!("Plan name must not be empty");
            }
            if !plan_names.insert(plan.name.as_str()) {
                bail!("Duplicate plan '{}'", plan.name);
            }
            if plan.duration_days <= 0 {
                bail!("duration_days of plan '{}' must be greater than 0", plan.name);
            }
            if plan.duration_days > MAX_PLAN_DURATION_DAYS {
                bail!(
                    "duration_days of plan '{}' must not exceed {}",
                    plan.name,
                    MAX_PLAN_DURATION_DAYS
                );
            }
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
