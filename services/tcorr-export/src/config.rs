//! Export service configuration.
//!
//! Loaded from a YAML file with `${VAR}` / `${VAR:-default}` environment
//! substitution, then overridden by command line flags.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ssebop_common::{DateRange, SceneId, Wrs2Tile};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tcorr_processor::{TcorrConfig, TcorrSourceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory of scene input JSON documents.
    pub scenes_dir: PathBuf,

    /// Root of the asset catalog read from and written to.
    pub catalog_dir: PathBuf,

    pub tcorr_source: TcorrSourceKind,

    pub tmax_source: String,

    /// Maximum scenes processed at once.
    pub max_concurrent: usize,

    /// Replace outputs that already exist.
    pub overwrite: bool,

    pub start_date: Option<NaiveDate>,

    /// Exclusive.
    pub end_date: Option<NaiveDate>,

    /// WRS2 tiles that are never exported.
    pub wrs2_skip: BTreeSet<Wrs2Tile>,

    /// Tcorr processing parameters.
    pub model: TcorrConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scenes_dir: PathBuf::from("/data/scenes"),
            catalog_dir: PathBuf::from("/data/tcorr"),
            tcorr_source: TcorrSourceKind::GriddedCold,
            tmax_source: "DAYMET_MEDIAN_V2".to_string(),
            max_concurrent: 4,
            overwrite: false,
            start_date: None,
            end_date: None,
            wrs2_skip: BTreeSet::new(),
            model: TcorrConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Load a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    /// Parse YAML after environment substitution.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: Self = serde_yaml::from_str(&expanded).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_concurrent > 0, "max_concurrent must be greater than 0");
        anyhow::ensure!(!self.tmax_source.trim().is_empty(), "tmax_source cannot be empty");
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            anyhow::ensure!(start < end, "start_date {} must be before end_date {}", start, end);
        }
        self.model
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid model config: {}", e))?;
        self.tcorr_source
            .check_tmax_source(&self.tmax_source)
            .context("Invalid source combination")?;
        Ok(())
    }

    /// The configured date window, if either end is set.
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.start_date, self.end_date) {
            (None, None) => None,
            (start, end) => Some(DateRange::new(
                start.unwrap_or(NaiveDate::MIN),
                end.unwrap_or(NaiveDate::MAX),
            )),
        }
    }

    /// Whether a scene should be exported.
    pub fn wants(&self, scene: &SceneId) -> bool {
        if self.wrs2_skip.contains(&scene.wrs2) {
            return false;
        }
        self.date_range().map_or(true, |range| range.contains(scene.date))
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut var_expr = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(c) => var_expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
            }
        }
        result.push_str(&resolve_var_expr(&var_expr)?);
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("TCORR_EXPORT_TEST_UNSET");
        let result = expand_env_vars("dir: ${TCORR_EXPORT_TEST_UNSET:-/tmp/tcorr}").unwrap();
        assert_eq!(result, "dir: /tmp/tcorr");
    }

    #[test]
    fn test_expand_env_vars_set() {
        std::env::set_var("TCORR_EXPORT_TEST_SOURCE", "SCENE");
        let result = expand_env_vars("tcorr_source: ${TCORR_EXPORT_TEST_SOURCE:-GRIDDED}").unwrap();
        assert_eq!(result, "tcorr_source: SCENE");
    }

    #[test]
    fn test_expand_env_vars_errors() {
        std::env::remove_var("TCORR_EXPORT_TEST_REQUIRED");
        assert!(expand_env_vars("${TCORR_EXPORT_TEST_REQUIRED}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_from_yaml() {
        let config = ExportConfig::from_yaml(
            r#"
scenes_dir: /scenes
catalog_dir: /catalog
tcorr_source: GRIDDED
tmax_source: DAYMET_MEDIAN_V2
start_date: 2017-01-01
end_date: 2018-01-01
wrs2_skip: [p049r026]
model:
  reflectance_type: TOA
  min_scene_count: 3
"#,
        )
        .unwrap();

        assert_eq!(config.tcorr_source, TcorrSourceKind::Gridded);
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.model.min_scene_count, 3);
        assert_eq!(config.model.coarse_cell_size, 5000.0);
        assert!(config.wrs2_skip.contains(&Wrs2Tile::new(49, 26)));

        let skipped: SceneId = "LC08_049026_20170716".parse().unwrap();
        let late: SceneId = "LC08_044033_20180716".parse().unwrap();
        let wanted: SceneId = "LC08_044033_20170716".parse().unwrap();
        assert!(!config.wants(&skipped));
        assert!(!config.wants(&late));
        assert!(config.wants(&wanted));
    }

    #[test]
    fn test_rejects_incompatible_sources() {
        let result = ExportConfig::from_yaml("tcorr_source: GRIDDED\ntmax_source: GRIDMET_MEDIAN_V1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_source() {
        assert!(ExportConfig::from_yaml("tcorr_source: WEEKLY\n").is_err());
    }

    #[test]
    fn test_bundled_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/tcorr-export.yaml");
        let config = ExportConfig::load(path).unwrap();
        assert_eq!(config.wrs2_skip.len(), 2);
    }
}
