use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub backend: Option<String>,

    pub supabase: Option<SupabaseConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 4000
logging_level = "headers"
backend = "supabase"

[supabase]
url = "https://project.supabase.co"
key = "service-key"
"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.port, Some(4000));
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.logging_level.as_deref(), Some("headers"));
        assert_eq!(config.backend.as_deref(), Some("supabase"));
        let supabase = config.supabase.unwrap();
        assert_eq!(supabase.url.as_deref(), Some("https://project.supabase.co"));
        assert_eq!(supabase.timeout_sec, None);
    }

    #[test]
    fn reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn reports_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/timeslot.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
