use std::path::{Path, PathBuf};

use daily539_data::models::DEFAULT_MIN_HISTORY;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{invalid, EngineError, Result};
use crate::recommend::validate_k;
use crate::scoring::{GapWindowBonusScore, LinearWeightedScore, ScoringStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    Linear(LinearWeightedScore),
    GapWindow(GapWindowBonusScore),
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyConfig::Linear(s) => s.validate(),
            StrategyConfig::GapWindow(s) => s.validate(),
        }
    }

    pub fn build(&self) -> Result<Box<dyn ScoringStrategy>> {
        self.validate()?;
        let strategy: Box<dyn ScoringStrategy> = match *self {
            StrategyConfig::Linear(s) => Box::new(s),
            StrategyConfig::GapWindow(s) => Box::new(s),
        };
        Ok(strategy)
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::Linear(LinearWeightedScore::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub strategy: StrategyConfig,
    pub top_k: usize,
    pub backtest_window: usize,
    pub roll_window: usize,
    pub min_history: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            top_k: 10,
            backtest_window: 30,
            roll_window: 30,
            min_history: DEFAULT_MIN_HISTORY,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;
        validate_k(self.top_k)?;
        if self.backtest_window == 0 {
            return Err(invalid("backtest_window must be at least 1"));
        }
        if self.roll_window == 0 {
            return Err(invalid("roll_window must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Invalid(#[from] EngineError),
}

pub fn load_config(path: &Path) -> std::result::Result<AnalysisConfig, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AnalysisConfig = serde_json::from_str(&json).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(config: &AnalysisConfig, path: &Path) -> std::result::Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.top_k, 10);
        assert_eq!(config.backtest_window, 30);
        assert_eq!(config.roll_window, 30);
        assert_eq!(config.min_history, 60);
        assert_eq!(config.strategy, StrategyConfig::Linear(LinearWeightedScore::default()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        let bad_k = AnalysisConfig { top_k: 40, ..Default::default() };
        assert!(bad_k.validate().is_err());
        let bad_window = AnalysisConfig { backtest_window: 0, ..Default::default() };
        assert!(bad_window.validate().is_err());
        let bad_roll = AnalysisConfig { roll_window: 0, ..Default::default() };
        assert!(bad_roll.validate().is_err());
        let bad_weight = AnalysisConfig {
            strategy: StrategyConfig::Linear(LinearWeightedScore { freq_weight: 10.0, gap_weight: -1.0 }),
            ..Default::default()
        };
        assert!(bad_weight.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "top_k": 8, "strategy": { "kind": "gap_window", "freq_weight": 5.0, "gap_min": 3, "gap_max": 9, "bonus": 12.5 } }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.top_k, 8);
        assert_eq!(config.backtest_window, 30);
        let strategy = config.strategy.build().unwrap();
        assert_eq!(strategy.name(), "GapWindowBonus");
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        let config = AnalysisConfig {
            strategy: StrategyConfig::GapWindow(GapWindowBonusScore::default()),
            roll_window: 45,
            ..Default::default()
        };
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        std::fs::write(&path, r#"{ "top_k": 0 }"#).unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Invalid(_))));
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Json { .. })));
        assert!(matches!(load_config(&dir.path().join("missing.json")), Err(ConfigError::Io { .. })));
    }
}
