//! Tunable engine constants.
//!
//! Defaults reproduce the constants in [`crate::constants`]. Hosts may
//! override any subset, e.g. from a TOML file:
//!
//! ```toml
//! max_nodes = 200
//!
//! [weights]
//! nourished = 75
//!
//! [spiral]
//! exponent = 0.25
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{EngineError, Result};

/// Population score weight per health state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub blooming: u32,
    pub nourished: u32,
    pub thirsty: u32,
    pub fading: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            blooming: WEIGHT_BLOOMING,
            nourished: WEIGHT_NOURISHED,
            thirsty: WEIGHT_THIRSTY,
            fading: WEIGHT_FADING,
        }
    }
}

/// Phyllotactic spiral parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiralConfig {
    pub min_density: f64,
    pub base_density: f64,
    pub exponent: f64,
    pub reference_population: usize,
    pub golden_angle_degrees: f64,
}

impl Default for SpiralConfig {
    fn default() -> Self {
        Self {
            min_density: SPIRAL_MIN,
            base_density: SPIRAL_BASE,
            exponent: SPIRAL_EXPONENT,
            reference_population: SPIRAL_REFERENCE_POPULATION,
            golden_angle_degrees: GOLDEN_ANGLE_DEGREES,
        }
    }
}

impl SpiralConfig {
    /// C = max(min, base · (ref / max(ref, n))^exponent)
    pub fn density(&self, n: usize) -> f64 {
        let reference = self.reference_population as f64;
        let scale = reference / reference.max(n as f64);
        self.min_density.max(self.base_density * scale.powf(self.exponent))
    }

    pub fn golden_angle(&self) -> f64 {
        self.golden_angle_degrees.to_radians()
    }
}

/// Node diameters for the three population-driven size tiers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSizes {
    pub small: f64,
    pub medium: f64,
    pub large: f64,
}

impl Default for NodeSizes {
    fn default() -> Self {
        Self {
            small: NODE_SIZE_SMALL,
            medium: NODE_SIZE_MEDIUM,
            large: NODE_SIZE_LARGE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: ScoreWeights,
    pub spiral: SpiralConfig,
    pub node_sizes: NodeSizes,
    pub max_nodes: usize,
    pub queue_size: usize,
    pub storm_tolerance_ratio: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            spiral: SpiralConfig::default(),
            node_sizes: NodeSizes::default(),
            max_nodes: DEFAULT_MAX_NODES,
            queue_size: DEFAULT_QUEUE_SIZE,
            storm_tolerance_ratio: STORM_TOLERANCE_RATIO,
        }
    }
}

impl EngineConfig {
    /// Reject configurations that would break the engine's ordering guarantees.
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        if !(w.blooming > w.nourished && w.nourished > w.thirsty && w.thirsty > w.fading) {
            return Err(EngineError::InvalidConfig(format!(
                "score weights must strictly decrease from blooming to fading: {}/{}/{}/{}",
                w.blooming, w.nourished, w.thirsty, w.fading
            )));
        }

        let s = &self.spiral;
        let spiral_ok = s.min_density > 0.0
            && s.base_density > 0.0
            && s.exponent.is_finite()
            && s.exponent >= 0.0
            && s.reference_population > 0
            && s.golden_angle_degrees > 0.0
            && s.golden_angle_degrees < 360.0;
        if !spiral_ok {
            return Err(EngineError::InvalidConfig(format!("spiral parameters out of range: {s:?}")));
        }

        let n = &self.node_sizes;
        if !(n.small > 0.0 && n.medium > 0.0 && n.large > 0.0) {
            return Err(EngineError::InvalidConfig(format!("node sizes must be positive: {n:?}")));
        }

        if !(0.0..=1.0).contains(&self.storm_tolerance_ratio) {
            return Err(EngineError::InvalidConfig(format!(
                "storm_tolerance_ratio must be within [0, 1]: {}",
                self.storm_tolerance_ratio
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_density_small_population_uses_base() {
        let s = SpiralConfig::default();
        // n ≤ 30 → scale 1 → C = 4.0
        assert_relative_eq!(s.density(0), 4.0);
        assert_relative_eq!(s.density(30), 4.0);
    }

    #[test]
    fn test_density_shrinks_then_floors() {
        let s = SpiralConfig::default();
        let c100 = s.density(100);
        assert_relative_eq!(c100, 4.0 * (0.3f64).powf(0.3), epsilon = 1e-12);
        assert!(c100 < 4.0);
        // 4 · (30/n)^0.3 drops below 2.5 once n > ~143
        assert_relative_eq!(s.density(300), 2.5);
        assert_relative_eq!(s.density(10_000), 2.5);
    }

    #[test]
    fn test_golden_angle_radians() {
        let s = SpiralConfig::default();
        assert_relative_eq!(s.golden_angle(), GOLDEN_ANGLE, epsilon = 1e-15);
    }

    #[test]
    fn test_rejects_non_decreasing_weights() {
        let mut cfg = EngineConfig::default();
        cfg.weights.thirsty = 70;
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_spiral_and_sizes() {
        let mut cfg = EngineConfig::default();
        cfg.spiral.min_density = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.node_sizes.medium = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.storm_tolerance_ratio = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"max_nodes": 50, "weights": {"nourished": 75}}"#).unwrap();
        assert_eq!(cfg.max_nodes, 50);
        assert_eq!(cfg.weights.nourished, 75);
        assert_eq!(cfg.weights.blooming, WEIGHT_BLOOMING);
        assert_eq!(cfg.queue_size, DEFAULT_QUEUE_SIZE);
        assert_eq!(cfg.spiral, SpiralConfig::default());
    }
}
