//! Matcher configuration
//!
//! Hand-tuned thresholds and weights, loadable from TOML. Any key missing
//! from a file keeps its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::{DEFAULT_MAX_DISTANCE, DEFAULT_SUGGESTION_LIMIT, SUGGESTION_MAX_DISTANCE};
use crate::error::{MatcherError, Result};

/// All tunables used by the disambiguator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub center: CenterRegionConfig,
    pub scoring: ScoringConfig,
    pub fuzzy: FuzzyConfig,
}

/// Where the frame's central region lies and how observations are weighted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterRegionConfig {
    /// Lower bound of the central region, as a fraction of width and height
    pub region_min: f64,
    /// Upper bound of the central region
    pub region_max: f64,
    /// Score for observations centred inside the region
    pub inside_score: f64,
    /// Score for observations outside it (down-weighted, not discarded)
    pub outside_score: f64,
    /// A family member counts as central at or above this score
    pub central_member_threshold: f64,
}

impl Default for CenterRegionConfig {
    fn default() -> Self {
        Self {
            region_min: 0.2,
            region_max: 0.8,
            inside_score: 1.0,
            outside_score: 0.3,
            central_member_threshold: 0.7,
        }
    }
}

/// Family scoring weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub center_weight: f64,
    pub frequency_weight: f64,
    /// The top family is picked automatically above this total score
    pub auto_resolve_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            center_weight: 0.7,
            frequency_weight: 0.3,
            auto_resolve_threshold: 0.7,
        }
    }
}

/// Edit-distance tolerances and text gates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    pub order_code_max_distance: usize,
    pub product_name_max_distance: usize,
    pub suggestion_max_distance: usize,
    pub suggestion_limit: usize,
    /// Shortest normalized text tried against product names
    pub min_name_query_len: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            order_code_max_distance: DEFAULT_MAX_DISTANCE,
            product_name_max_distance: DEFAULT_MAX_DISTANCE,
            suggestion_max_distance: SUGGESTION_MAX_DISTANCE,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            min_name_query_len: 4,
        }
    }
}

impl MatcherConfig {
    /// Reject values the scoring cannot work with
    pub fn validate(&self) -> Result<()> {
        let c = &self.center;
        for (name, value) in [
            ("center.region_min", c.region_min),
            ("center.region_max", c.region_max),
            ("center.inside_score", c.inside_score),
            ("center.outside_score", c.outside_score),
            ("center.central_member_threshold", c.central_member_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MatcherError::InvalidConfig(format!(
                    "{} must be within 0.0-1.0, got {}",
                    name, value
                )));
            }
        }
        if c.region_min >= c.region_max {
            return Err(MatcherError::InvalidConfig(format!(
                "center.region_min ({}) must be below center.region_max ({})",
                c.region_min, c.region_max
            )));
        }

        let s = &self.scoring;
        if !(s.center_weight >= 0.0 && s.frequency_weight >= 0.0) {
            return Err(MatcherError::InvalidConfig(
                "scoring weights must be non-negative".to_string(),
            ));
        }
        if !s.auto_resolve_threshold.is_finite() {
            return Err(MatcherError::InvalidConfig(
                "scoring.auto_resolve_threshold must be finite".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load and validate configuration from a TOML file
pub fn load_config(path: &Path) -> Result<MatcherConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: MatcherConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config(config: &MatcherConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = MatcherConfig::default();

        assert!((config.center.region_min - 0.2).abs() < 1e-9);
        assert!((config.center.region_max - 0.8).abs() < 1e-9);
        assert!((config.center.inside_score - 1.0).abs() < 1e-9);
        assert!((config.center.outside_score - 0.3).abs() < 1e-9);
        assert!((config.scoring.center_weight - 0.7).abs() < 1e-9);
        assert!((config.scoring.frequency_weight - 0.3).abs() < 1e-9);
        assert!((config.scoring.auto_resolve_threshold - 0.7).abs() < 1e-9);
        assert_eq!(config.fuzzy.order_code_max_distance, 1);
        assert_eq!(config.fuzzy.product_name_max_distance, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = MatcherConfig::default();
        config.scoring.auto_resolve_threshold = 0.6;
        config.fuzzy.order_code_max_distance = 2;

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[scoring]\ncenter_weight = 0.5").unwrap();

        let loaded = load_config(temp_file.path()).unwrap();
        assert!((loaded.scoring.center_weight - 0.5).abs() < 1e-9);
        assert!((loaded.scoring.frequency_weight - 0.3).abs() < 1e-9);
        assert_eq!(loaded.center, CenterRegionConfig::default());
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/matcher.toml"));
        assert!(matches!(result, Err(MatcherError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(MatcherError::TomlParse(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_region() {
        let mut config = MatcherConfig::default();
        config.center.region_min = 0.9;
        assert!(matches!(config.validate(), Err(MatcherError::InvalidConfig(_))));

        let mut config = MatcherConfig::default();
        config.center.outside_score = 1.5;
        assert!(config.validate().is_err());

        let mut config = MatcherConfig::default();
        config.scoring.frequency_weight = -0.1;
        assert!(config.validate().is_err());
    }
}
