use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

const APP_DIR: &str = "opposition-tracker";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the baseline workbook, report CSVs and county reports.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_baseline_workbook")]
    pub baseline_workbook: String,

    #[serde(default = "default_baseline_sheet")]
    pub baseline_sheet: String,

    /// Tried in order when the primary workbook is missing. `.csv` files are
    /// read as CSV, anything else as a workbook (first sheet).
    #[serde(default = "default_baseline_fallbacks")]
    pub baseline_fallbacks: Vec<String>,

    #[serde(default = "default_restrictions_csv")]
    pub restrictions_csv: String,

    #[serde(default = "default_contested_csv")]
    pub contested_csv: String,

    /// Sub-directory of `data_dir` with `spark_bulk_report_<STATE>_counties_*.csv` files.
    #[serde(default = "default_county_reports_dir")]
    pub county_reports_dir: String,

    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,

    /// Local record store used when no hosted credentials are configured.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_baseline_workbook() -> String {
    "DESRI_PowerBI_Complete.xlsx".to_string()
}

fn default_baseline_sheet() -> String {
    "Fact_Projects".to_string()
}

fn default_baseline_fallbacks() -> Vec<String> {
    vec![
        "desri_public_opps_major_tracker_with_counties_corrected.xlsx".to_string(),
        "desri_public_opps_major_tracker_with_counties.xlsx".to_string(),
        "projects.csv".to_string(),
    ]
}

fn default_restrictions_csv() -> String {
    "2025-Restrictions.csv".to_string()
}

fn default_contested_csv() -> String {
    "2025-Contested-Projects.csv".to_string()
}

fn default_county_reports_dir() -> String {
    "us_public_opposition_sparkai".to_string()
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("records.db").to_string_lossy().to_string()
}

fn default_cache_ttl_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            baseline_workbook: default_baseline_workbook(),
            baseline_sheet: default_baseline_sheet(),
            baseline_fallbacks: default_baseline_fallbacks(),
            restrictions_csv: default_restrictions_csv(),
            contested_csv: default_contested_csv(),
            county_reports_dir: default_county_reports_dir(),
            supabase_url: None,
            supabase_key: None,
            db_path: default_db_path(),
            cache_ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Environment credentials win over the file so deployments never need
    /// to write secrets to disk.
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SUPABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_KEY").filter(|v| !v.trim().is_empty()) {
            self.supabase_key = Some(key);
        }
    }

    /// Hosted credentials, only when both halves are present.
    pub fn hosted_credentials(&self) -> Option<(&str, &str)> {
        match (self.supabase_url.as_deref(), self.supabase_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some((url, key)),
            _ => None,
        }
    }

    pub fn data_path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            data_dir = "/srv/tracker"
            cache_ttl_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/tracker"));
        assert_eq!(config.baseline_sheet, "Fact_Projects");
        assert_eq!(config.cache_ttl(), Duration::from_millis(250));
        assert!(config.hosted_credentials().is_none());
        assert_eq!(
            config.data_path("2025-Restrictions.csv"),
            PathBuf::from("/srv/tracker/2025-Restrictions.csv")
        );
    }

    #[test]
    fn env_overrides_credentials() {
        let mut config: Config = toml::from_str(r#"supabase_url = "https://file.example""#).unwrap();
        config.apply_env(|key| match key {
            "SUPABASE_URL" => Some("https://env.example".to_string()),
            "SUPABASE_KEY" => Some("secret".to_string()),
            _ => None,
        });

        assert_eq!(
            config.hosted_credentials(),
            Some(("https://env.example", "secret"))
        );
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config: Config = toml::from_str(r#"supabase_key = "from-file""#).unwrap();
        config.apply_env(|_| Some("  ".to_string()));

        assert_eq!(config.supabase_key.as_deref(), Some("from-file"));
        assert!(config.hosted_credentials().is_none());
    }
}
