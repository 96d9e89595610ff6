//! System configuration: all numeric knobs in one serde-backed struct,
//! loadable from and savable to a JSON file.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algorithms::lm::SolverConfig;
use crate::core::geometry::distance;
use crate::core::types::AnchorSet;
use crate::filtering::kalman::FilterConfig;
use crate::fusion::FusionConfig;

/// Coincident or near-coincident anchors make the geometry unsolvable
const MIN_ANCHOR_SPACING_M: f64 = 0.05;

/// Complete tracking configuration for one deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Anchor positions in the solver frame, when fixed per deployment
    pub anchors: Option<AnchorSet>,
    /// Multilateration solver tuning
    pub solver: SolverConfig,
    /// Robust filter tuning
    pub filter: FilterConfig,
    /// Fusion-layer tuning
    pub fusion: FusionConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            anchors: None,
            solver: SolverConfig::default(),
            filter: FilterConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}

/// Configuration loading/validation failures
#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read or written
    Io { path: String, source: std::io::Error },
    /// File contents are not valid JSON for [`SystemConfig`]
    Parse { path: String, source: serde_json::Error },
    /// A parameter is outside its valid range
    InvalidParameter { parameter: &'static str, value: f64, reason: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "config I/O error for {path}: {source}")
            }
            ConfigError::Parse { path, source } => {
                write!(f, "config parse error for {path}: {source}")
            }
            ConfigError::InvalidParameter { parameter, value, reason } => {
                write!(f, "invalid config parameter {parameter} = {value}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidParameter { .. } => None,
        }
    }
}

impl SystemConfig {
    /// Load and validate a configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let config: SystemConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path_str,
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path_str.clone(),
            source,
        })?;
        fs::write(&path, content).map_err(|source| ConfigError::Io {
            path: path_str,
            source,
        })
    }

    /// Check every knob against its valid range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive: [(&'static str, f64); 9] = [
            ("solver.lambda_init", self.solver.lambda_init),
            ("solver.tol_step", self.solver.tol_step),
            ("solver.tol_res", self.solver.tol_res),
            ("solver.max_step", self.solver.max_step),
            ("filter.process_var", self.filter.process_var),
            ("filter.meas_var", self.filter.meas_var),
            ("filter.alpha", self.filter.alpha),
            ("filter.beta_init", self.filter.beta_init),
            ("fusion.dt", self.fusion.dt),
        ];
        for (parameter, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    parameter,
                    value,
                    reason: "must be positive",
                });
            }
        }

        if self.solver.max_iter == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "solver.max_iter",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if self.solver.z_min >= self.solver.z_max {
            return Err(ConfigError::InvalidParameter {
                parameter: "solver.z_min",
                value: self.solver.z_min,
                reason: "must be below z_max",
            });
        }
        if let Some(anchors) = &self.anchors {
            let pts = anchors.positions();
            for i in 0..pts.len() {
                for j in (i + 1)..pts.len() {
                    if distance(&pts[i], &pts[j]) < MIN_ANCHOR_SPACING_M {
                        return Err(ConfigError::InvalidParameter {
                            parameter: "anchors",
                            value: distance(&pts[i], &pts[j]),
                            reason: "anchor pair closer than the minimum spacing",
                        });
                    }
                }
            }
        }

        if !(0.0..=1.0).contains(&self.fusion.height_prior_alpha) {
            return Err(ConfigError::InvalidParameter {
                parameter: "fusion.height_prior_alpha",
                value: self.fusion.height_prior_alpha,
                reason: "must lie in [0, 1]",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point3;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SystemConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_z_band_rejected() {
        let mut config = SystemConfig::default();
        config.solver.z_min = 4.0;
        config.solver.z_max = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { parameter: "solver.z_min", .. })
        ));
    }

    #[test]
    fn test_non_positive_variance_rejected() {
        let mut config = SystemConfig::default();
        config.filter.meas_var = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_coincident_anchors_rejected() {
        let mut config = SystemConfig::default();
        let p = Point3::new(1.0, 1.0, 2.0);
        config.anchors = Some(AnchorSet::new([
            p,
            p,
            Point3::new(0.0, 5.0, 2.0),
            Point3::new(5.0, 5.0, 2.0),
        ]));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { parameter: "anchors", .. })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = SystemConfig::default();
        config.anchors = Some(AnchorSet::new([
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(5.0, 0.0, 2.0),
            Point3::new(0.0, 5.0, 2.0),
            Point3::new(5.0, 5.0, 2.0),
        ]));
        config.filter.alpha = 2.0;

        let json = serde_json::to_string(&config).unwrap();
        let back: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = std::env::temp_dir();
        let path = dir.join("uwb_fusion_config_test.json");

        let config = SystemConfig::default();
        config.save_to_file(&path).unwrap();
        let loaded = SystemConfig::load_from_file(&path).unwrap();
        assert_eq!(config, loaded);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SystemConfig::load_from_file("/nonexistent/uwb.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
