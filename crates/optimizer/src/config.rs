use serde::{Deserialize, Serialize};

/// Configuration for optimization and chunking behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Budget used by `optimize_context` when the caller passes none
    pub default_max_tokens: usize,

    /// Chunk size (estimated tokens) used by `chunk_context` when none is given
    pub default_chunk_size: usize,

    /// Upper bound on trailing lines carried into the next chunk
    pub max_overlap_lines: usize,

    /// Overlap is also capped at this percentage of the previous chunk's lines
    pub overlap_percent: usize,

    /// Limit reported by `token_info` as "within limit"
    pub token_limit: usize,

    /// Flat price used for the linear cost estimate
    pub cost_per_1k_tokens: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            default_max_tokens: 8_000,
            default_chunk_size: 2_000,
            max_overlap_lines: 5,
            overlap_percent: 10,
            token_limit: 8_000,
            cost_per_1k_tokens: 0.002,
        }
    }
}

impl OptimizerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_max_tokens == 0 {
            return Err("default_max_tokens must be > 0".to_string());
        }

        if self.default_chunk_size == 0 {
            return Err("default_chunk_size must be > 0".to_string());
        }

        if self.overlap_percent > 100 {
            return Err(format!(
                "overlap_percent ({}) cannot exceed 100",
                self.overlap_percent
            ));
        }

        if !self.cost_per_1k_tokens.is_finite() || self.cost_per_1k_tokens < 0.0 {
            return Err("cost_per_1k_tokens must be a non-negative number".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(OptimizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = OptimizerConfig::default();

        config.default_chunk_size = 0;
        assert!(config.validate().is_err());

        config.default_chunk_size = 100;
        config.overlap_percent = 150;
        assert!(config.validate().is_err());

        config.overlap_percent = 10;
        config.cost_per_1k_tokens = f64::NAN;
        assert!(config.validate().is_err());

        config.cost_per_1k_tokens = 0.0;
        assert!(config.validate().is_ok());
    }
}
