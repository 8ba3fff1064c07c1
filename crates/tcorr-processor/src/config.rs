//! Configuration for Tcorr processing.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the Tcorr processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcorrConfig {
    /// Coarse cell size in scene map units.
    pub coarse_cell_size: f64,

    /// Origin of the coarse lattice in scene map units.
    pub coarse_origin: (f64, f64),

    /// Percentile of the fine cold ratios kept per coarse cell.
    pub cold_percentile: f64,

    /// Percentile of the fine hot ratios kept per coarse cell.
    pub hot_percentile: f64,

    /// Percentile of the scene-wide cold ratios used by `DYNAMIC`.
    pub dynamic_percentile: f64,

    /// Minimum cold pixel count for a `DYNAMIC` scene value to be used.
    pub dynamic_count_threshold: u32,

    /// Reflectance type of the input scenes; selects the NDVI thresholds.
    pub reflectance_type: ReflectanceType,

    /// Substitute the monthly gridded composite when a scene has no
    /// coarse cold cells.
    pub fill_climatology: bool,

    /// Minimum number of scenes per pixel in a monthly composite.
    pub min_scene_count: u32,

    /// Maximum attempts for a catalog read.
    pub retry_attempts: u32,

    /// Base delay between catalog read attempts in milliseconds. The
    /// delay before attempt `n + 1` is `n² × base`.
    pub retry_base_delay_ms: u64,
}

impl Default for TcorrConfig {
    fn default() -> Self {
        Self {
            coarse_cell_size: 5000.0,
            coarse_origin: (15.0, 15.0),
            cold_percentile: 2.5,
            hot_percentile: 70.0,
            dynamic_percentile: 2.5,
            dynamic_count_threshold: 1000,
            reflectance_type: ReflectanceType::Sr,
            fill_climatology: true,
            min_scene_count: 1,
            retry_attempts: 9,
            retry_base_delay_ms: 1000,
        }
    }
}

impl TcorrConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TCORR_COARSE_CELL_SIZE") {
            if let Ok(size) = val.parse() {
                config.coarse_cell_size = size;
            }
        }

        if let Ok(val) = std::env::var("TCORR_DYNAMIC_COUNT_THRESHOLD") {
            if let Ok(count) = val.parse() {
                config.dynamic_count_threshold = count;
            }
        }

        if let Ok(val) = std::env::var("TCORR_REFLECTANCE_TYPE") {
            if let Ok(reflectance) = val.parse() {
                config.reflectance_type = reflectance;
            }
        }

        if let Ok(val) = std::env::var("TCORR_FILL_CLIMO") {
            config.fill_climatology = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("TCORR_MIN_SCENE_COUNT") {
            if let Ok(count) = val.parse() {
                config.min_scene_count = count;
            }
        }

        if let Ok(val) = std::env::var("TCORR_RETRY_ATTEMPTS") {
            if let Ok(attempts) = val.parse() {
                config.retry_attempts = attempts;
            }
        }

        if let Ok(val) = std::env::var("TCORR_RETRY_DELAY_MS") {
            if let Ok(ms) = val.parse() {
                config.retry_base_delay_ms = ms;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.coarse_cell_size.is_nan() || self.coarse_cell_size <= 0.0 {
            return Err("coarse_cell_size must be > 0".to_string());
        }

        for (name, p) in [
            ("cold_percentile", self.cold_percentile),
            ("hot_percentile", self.hot_percentile),
            ("dynamic_percentile", self.dynamic_percentile),
        ] {
            if !(0.0..=100.0).contains(&p) {
                return Err(format!("{} must be within 0-100", name));
            }
        }

        if self.min_scene_count == 0 {
            return Err("min_scene_count must be > 0".to_string());
        }

        if self.retry_attempts == 0 {
            return Err("retry_attempts must be > 0".to_string());
        }

        Ok(())
    }

    /// Base delay between catalog read attempts.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Surface reflectance or top-of-atmosphere inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReflectanceType {
    #[default]
    Sr,
    Toa,
}

impl ReflectanceType {
    /// Minimum NDVI for cold (fully vegetated) candidates.
    pub fn cold_ndvi_threshold(&self) -> f32 {
        match self {
            Self::Sr => 0.75,
            Self::Toa => 0.70,
        }
    }

    /// Maximum NDVI for hot (bare soil) candidates.
    pub fn hot_ndvi_threshold(&self) -> f32 {
        match self {
            Self::Sr => 0.30,
            Self::Toa => 0.25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sr => "SR",
            Self::Toa => "TOA",
        }
    }
}

impl FromStr for ReflectanceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SR" => Ok(Self::Sr),
            "TOA" => Ok(Self::Toa),
            other => Err(format!("unsupported reflectance type: {}", other)),
        }
    }
}

impl std::fmt::Display for ReflectanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TcorrConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.coarse_cell_size, 5000.0);
        assert_eq!(config.coarse_origin, (15.0, 15.0));
        assert_eq!(config.dynamic_count_threshold, 1000);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TcorrConfig::default();
        config.hot_percentile = 170.0;
        assert!(config.validate().is_err());

        let mut config = TcorrConfig::default();
        config.coarse_cell_size = 0.0;
        assert!(config.validate().is_err());

        let mut config = TcorrConfig::default();
        config.retry_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reflectance_thresholds() {
        assert_eq!(ReflectanceType::Sr.cold_ndvi_threshold(), 0.75);
        assert_eq!(ReflectanceType::Toa.cold_ndvi_threshold(), 0.70);
        assert_eq!(ReflectanceType::Sr.hot_ndvi_threshold(), 0.30);
        assert_eq!(ReflectanceType::Toa.hot_ndvi_threshold(), 0.25);
        assert_eq!("toa".parse::<ReflectanceType>().unwrap(), ReflectanceType::Toa);
        assert!("LST".parse::<ReflectanceType>().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: TcorrConfig =
            serde_json::from_str(r#"{"reflectance_type": "TOA", "min_scene_count": 3}"#).unwrap();
        assert_eq!(config.reflectance_type, ReflectanceType::Toa);
        assert_eq!(config.min_scene_count, 3);
        assert_eq!(config.cold_percentile, 2.5);
    }
}
