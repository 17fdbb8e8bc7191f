use serde::{Deserialize, Serialize};

pub const DEFAULT_LATENT_DIMENSIONS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Requested latent dimension; the effective one is capped by the matrix rank.
    pub latent_dimensions: usize,
    /// Tokenize documents on the rayon pool (needs the `parallel` feature).
    pub parallel_build: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { latent_dimensions: DEFAULT_LATENT_DIMENSIONS, parallel_build: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"latent_dimensions": 8}"#).unwrap();
        assert_eq!(cfg.latent_dimensions, 8);
        assert!(cfg.parallel_build);
    }
}
