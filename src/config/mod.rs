mod file_config;

pub use file_config::{FileConfig, SupabaseConfig};

use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;

pub const DEFAULT_SUPABASE_TIMEOUT_SEC: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendKind {
    /// In-process store, data is lost on restart.
    #[default]
    Memory,
    Supabase,
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub backend: BackendKind,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub supabase_timeout_sec: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub key: String,
    pub timeout_sec: u64,
}

#[derive(Debug, Clone)]
pub enum BackendSettings {
    Memory,
    Supabase(SupabaseSettings),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub backend: BackendSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port {
            bail!("port and metrics_port must differ (both are {})", port);
        }

        let logging_level = match file.logging_level {
            Some(s) => parse_logging_level(&s)
                .ok_or_else(|| anyhow::anyhow!("Invalid logging_level in config file: {}", s))?,
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let backend_kind = match file.backend {
            Some(s) => BackendKind::from_str(&s, true)
                .map_err(|_| anyhow::anyhow!("Invalid backend in config file: {}", s))?,
            None => cli.backend,
        };

        let backend = match backend_kind {
            BackendKind::Memory => BackendSettings::Memory,
            BackendKind::Supabase => {
                let supabase_file = file.supabase.unwrap_or_default();
                let url = supabase_file
                    .url
                    .or_else(|| cli.supabase_url.clone())
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "supabase url must be specified via --supabase-url, SUPABASE_URL or in config file"
                        )
                    })?;
                let key = supabase_file
                    .key
                    .or_else(|| cli.supabase_key.clone())
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "supabase key must be specified via --supabase-key, SUPABASE_SERVICE_KEY or in config file"
                        )
                    })?;
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    bail!("supabase url must start with http:// or https://: {}", url);
                }
                let timeout_sec = supabase_file
                    .timeout_sec
                    .or(cli.supabase_timeout_sec)
                    .unwrap_or(DEFAULT_SUPABASE_TIMEOUT_SEC);
                BackendSettings::Supabase(SupabaseSettings {
                    url: url.trim_end_matches('/').to_string(),
                    key,
                    timeout_sec,
                })
            }
        };

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            backend,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            frontend_dir_path: self.frontend_dir_path.clone(),
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
