//! Run settings, optionally overridden by `panchanga.conl`

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::parse_iso_date;
use crate::upload::{BATCH_SIZE, COLLECTION};

pub const CONFIG_FILE: &str = "panchanga.conl";
pub const PAGE_URL: &str = "https://srsmatha.org/srsbook/?page=app/app&appcontent=app_panchanga";
pub const START_DATE: &str = "2026-01-01";
pub const END_DATE: &str = "2026-03-20";
pub const CSV_FILE: &str = "panchanga.csv";
pub const CREDENTIALS_FILE: &str = "serviceAccountKey.json";
const CACHE_DIR: &str = "cache";

/// Firestore rejects commits with more writes than this
const MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub page_url: String,
    /// Query parameter that selects the day shown by the page
    pub date_param: String,
    pub start_date: String,
    /// Exclusive
    pub end_date: String,
    pub collection: String,
    pub batch_size: usize,
    /// Set to an empty string to disable the page cache
    pub cache_dir: String,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_url: PAGE_URL.to_string(),
            date_param: "date".to_string(),
            start_date: START_DATE.to_string(),
            end_date: END_DATE.to_string(),
            collection: COLLECTION.to_string(),
            batch_size: BATCH_SIZE,
            cache_dir: CACHE_DIR.to_string(),
            user_agent: "Mozilla/5.0 (compatible; PanchangaScraper/1.0)".to_string(),
        }
    }
}

impl Config {
    /// Load settings from a CONL file. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config: {}", path.display()))
            }
        };
        let config: Config = serde_conl::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let (start, end) = self.date_range()?;
        if start > end {
            bail!(
                "start_date {} is after end_date {}",
                self.start_date,
                self.end_date
            );
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            bail!(
                "batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE,
                self.batch_size
            );
        }
        Ok(())
    }

    /// Start (inclusive) and end (exclusive) of the scrape
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        Ok((
            parse_iso_date(&self.start_date)?,
            parse_iso_date(&self.end_date)?,
        ))
    }

    pub fn cache_dir(&self) -> Option<PathBuf> {
        let dir = self.cache_dir.trim();
        (!dir.is_empty()).then(|| PathBuf::from(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.start_date, "2026-01-01");
        assert_eq!(config.end_date, "2026-03-20");
        assert_eq!(config.collection, "panchanga_data");
        assert_eq!(config.batch_size, 400);
        assert_eq!(config.cache_dir(), Some(PathBuf::from("cache")));
    }

    #[test]
    fn test_load_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "; February only\nstart_date = 2026-02-01\nend_date = 2026-03-01\nbatch_size = 100\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        let (start, end) = config.date_range().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.collection, "panchanga_data");
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let config = Config {
            start_date: "2026-03-20".into(),
            end_date: "2026-01-01".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            start_date: "January 1, 2026".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_cache_dir_disables_cache() {
        let config = Config {
            cache_dir: " ".into(),
            ..Default::default()
        };
        assert_eq!(config.cache_dir(), None);
    }
}
