//! Runtime settings for the orchestrator
//!
//! Each value resolves through command line → environment → TOML → default.

use mtm_common::config::{
    resolve_setting, ResolvedSetting, SettingSource, TomlConfig, DEFAULT_BIND_ADDRESS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVICE_URL, DEFAULT_USER_AGENT, ENV_BIND_ADDRESS,
    ENV_LOG_LEVEL, ENV_SERVICE_URL,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Values given on the command line, if any
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub service_url: Option<String>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub service_url: ResolvedSetting,
    pub bind_address: ResolvedSetting,
    pub log_level: ResolvedSetting,
    pub log_file: Option<PathBuf>,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Settings {
    pub fn resolve(toml: &TomlConfig, cli: &CliOverrides) -> Self {
        let service_url = resolve_setting(
            cli.service_url.as_deref(),
            ENV_SERVICE_URL,
            toml.service_url.as_deref(),
            DEFAULT_SERVICE_URL,
        );
        let bind_address = resolve_setting(
            cli.bind_address.as_deref(),
            ENV_BIND_ADDRESS,
            toml.bind_address.as_deref(),
            DEFAULT_BIND_ADDRESS,
        );
        let log_level = resolve_setting(
            cli.log_level.as_deref(),
            ENV_LOG_LEVEL,
            Some(toml.logging.level.as_str()),
            "info",
        );

        let request_timeout = Duration::from_secs(
            toml.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        let user_agent = toml
            .user_agent
            .clone()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Self {
            service_url,
            bind_address,
            log_level,
            log_file: toml.logging.file.clone(),
            request_timeout,
            user_agent,
        }
    }

    /// Log where each value came from
    pub fn log_sources(&self) {
        for (name, setting) in [
            ("service_url", &self.service_url),
            ("bind_address", &self.bind_address),
            ("log_level", &self.log_level),
        ] {
            info!(
                setting = name,
                value = %setting.value,
                source = source_label(setting.source),
                "Resolved setting"
            );
        }
    }
}

fn source_label(source: SettingSource) -> &'static str {
    match source {
        SettingSource::CommandLine => "command line",
        SettingSource::Environment => "environment",
        SettingSource::TomlFile => "config file",
        SettingSource::Default => "default",
    }
}
