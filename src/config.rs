use crate::dates::NO_DELTA_DATE;
use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "marginalia")]
#[command(about = "Publishes e-reader highlights and notes to Notion", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".marginalia")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct Device {
    pub database_path: String,
    pub database_cache: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Notion {
    pub integration_token: String,
    pub parent_page: String,
    #[serde(default = "default_icon")]
    pub icon: String,
}

fn default_icon() -> String {
    "📖".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Sync {
    #[serde(default)]
    pub watermark: String,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub device: Device,
    pub notion: Notion,
    #[serde(default)]
    pub sync: Sync,
    #[serde(skip)]
    path: PathBuf,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let mut cfg = Config::load_config(path)?;
        cfg.path = PathBuf::from(path);
        Ok(cfg)
    }

    /// The configured watermark, falling back to the epoch sentinel when the
    /// field is empty so a fresh config publishes everything.
    pub fn watermark(&self) -> &str {
        let trimmed = self.sync.watermark.trim();
        if trimmed.is_empty() { NO_DELTA_DATE } else { trimmed }
    }

    /// Rewrites only `sync.watermark` in the on-disk file. The raw text is
    /// re-parsed so `${VAR}` placeholders in other fields survive untouched.
    pub fn persist_watermark(&self, watermark: &str) -> Result<()> {
        let raw = fs::read_to_string(&self.path)?;
        let mut doc: Value = serde_yaml::from_str(&raw)?;

        let Value::Mapping(root) = &mut doc else {
            anyhow::bail!("config file is not a yaml mapping");
        };
        let key = Value::from("sync");
        if !root.contains_key(&key) {
            root.insert(key.clone(), Value::Mapping(Mapping::new()));
        }
        match root.get_mut(&key) {
            Some(Value::Mapping(section)) => {
                section.insert(Value::from("watermark"), Value::from(watermark));
            }
            _ => anyhow::bail!("sync section is not a yaml mapping"),
        }

        fs::write(&self.path, serde_yaml::to_string(&doc)?)?;
        Ok(())
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        let yaml_with_env = Config::substitute_env_vars(&yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // Handle default values like ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!("environment variable '{}' not found", var_name);
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
device:
  database_path: "/media/reader/.kobo/KoboReader.sqlite"
  database_cache: "/tmp/KoboReader.sqlite"
notion:
  integration_token: "${MARGINALIA_TEST_TOKEN:-fallback-token}"
  parent_page: "parent-id"
  icon: "✍️"
sync:
  watermark: ""
"#;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_substitutes_env_defaults() {
        let file = write_config(CONFIG);
        let cfg = Config::new(file.path().to_str().unwrap()).unwrap();

        assert_eq!(cfg.notion.integration_token, "fallback-token");
        assert_eq!(cfg.notion.parent_page, "parent-id");
        assert_eq!(cfg.device.database_cache, "/tmp/KoboReader.sqlite");
    }

    #[test]
    fn test_empty_watermark_falls_back_to_sentinel() {
        let file = write_config(CONFIG);
        let cfg = Config::new(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.watermark(), NO_DELTA_DATE);
    }

    #[test]
    fn test_missing_sync_section_falls_back_to_sentinel() {
        let trimmed: String = CONFIG.lines().take_while(|l| !l.starts_with("sync:")).collect::<Vec<_>>().join("\n");
        let file = write_config(&trimmed);
        let cfg = Config::new(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.watermark(), NO_DELTA_DATE);
    }

    #[test]
    fn test_persist_watermark_keeps_placeholders() {
        let file = write_config(CONFIG);
        let cfg = Config::new(file.path().to_str().unwrap()).unwrap();

        cfg.persist_watermark("2023-06-01 00:00:00").unwrap();

        let raw = fs::read_to_string(file.path()).unwrap();
        assert!(raw.contains("${MARGINALIA_TEST_TOKEN:-fallback-token}"));

        let reloaded = Config::new(file.path().to_str().unwrap()).unwrap();
        assert_eq!(reloaded.watermark(), "2023-06-01 00:00:00");
        assert_eq!(reloaded.device.database_path, "/media/reader/.kobo/KoboReader.sqlite");
    }
}
