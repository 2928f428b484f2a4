use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SpectraError};
use crate::formula::FormulaRegistry;
use crate::localizer::ComputationStrategy;
use crate::ranking::{NormalizationStrategy, TieBreak};

/// Fault localization settings
///
/// ```toml
/// formula = "dstar2"
/// strategy = "similarity"
/// tie_break = "worst_case"
/// normalization = "zero_to_one_ranking_value"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    /// Formula name, resolved case-insensitively through a [`FormulaRegistry`]
    pub formula: String,

    /// How spectrum counts are computed
    pub strategy: ComputationStrategy,

    /// Rank reported for tied nodes
    pub tie_break: TieBreak,

    /// Optional rescaling of the final ranking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalization: Option<NormalizationStrategy>,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            formula: "ochiai".to_string(),
            strategy: ComputationStrategy::Standard,
            tie_break: TieBreak::BestCase,
            normalization: None,
        }
    }
}

impl LocalizationConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SpectraError::InvalidConfig(e.to_string()))
    }

    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that the formula is known to `registry`
    pub fn validate(&self, registry: &FormulaRegistry) -> Result<()> {
        if self.formula.trim().is_empty() {
            return Err(SpectraError::InvalidConfig(
                "formula name must not be empty".to_string(),
            ));
        }
        registry.get(&self.formula).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = LocalizationConfig::default();
        assert_eq!(config.formula, "ochiai");
        assert_eq!(config.strategy, ComputationStrategy::Standard);
        assert_eq!(config.tie_break, TieBreak::BestCase);
        assert!(config.normalization.is_none());
        assert!(config.validate(&FormulaRegistry::default()).is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = LocalizationConfig::from_toml_str("strategy = \"similarity\"").unwrap();
        assert_eq!(config.strategy, ComputationStrategy::Similarity);
        assert_eq!(config.formula, "ochiai");
    }

    #[test]
    fn test_full_toml() {
        let content = r#"
formula = "GP13"
strategy = "standard"
tie_break = "worst_case"
normalization = "reciprocal_rank"
"#;
        let config = LocalizationConfig::from_toml_str(content).unwrap();
        assert_eq!(config.formula, "GP13");
        assert_eq!(config.tie_break, TieBreak::WorstCase);
        assert_eq!(
            config.normalization,
            Some(NormalizationStrategy::ReciprocalRank)
        );
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let err = LocalizationConfig::from_toml_str("strategy = \"quantum\"").unwrap_err();
        assert!(matches!(err, SpectraError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_unknown_formula() {
        let config = LocalizationConfig {
            formula: "zoltar".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(&FormulaRegistry::default()),
            Err(SpectraError::UnknownFormula("zoltar".to_string()))
        );

        let config = LocalizationConfig {
            formula: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(&FormulaRegistry::default()),
            Err(SpectraError::InvalidConfig(_))
        ));
    }

    // ============================================================================
    // LOAD/SAVE TESTS
    // ============================================================================

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("faultline.toml");

        let config = LocalizationConfig {
            formula: "dstar3".to_string(),
            strategy: ComputationStrategy::Similarity,
            tie_break: TieBreak::Average,
            normalization: Some(NormalizationStrategy::ZeroToOneRanking),
        };
        config.save(&config_path).unwrap();
        assert!(config_path.exists());

        let loaded = LocalizationConfig::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_without_normalization() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("faultline.toml");

        LocalizationConfig::default().save(&config_path).unwrap();
        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(!content.contains("normalization"));
        assert_eq!(
            LocalizationConfig::load(&config_path).unwrap(),
            LocalizationConfig::default()
        );
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = LocalizationConfig::load(Path::new("/nonexistent/faultline.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "invalid toml content [[[").unwrap();

        assert!(LocalizationConfig::load(&config_path).is_err());
    }
}
