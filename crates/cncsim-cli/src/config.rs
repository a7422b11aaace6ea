//! Job configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cncsim_gcode::ParseOptions;
use cncsim_machine::SimConfig;
use cncsim_stock::{StockConfig, ToolEntry};
use serde::{Deserialize, Serialize};

/// Where the sampled path goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path file, one `G1` line per point.
    pub path: PathBuf,
    /// Write the path file at all.
    pub write_path: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("path.gcode"),
            write_path: true,
        }
    }
}

/// Everything a run needs besides the program itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Parser settings.
    pub parse: ParseOptions,
    /// Motion settings.
    pub sim: SimConfig,
    /// Stock block and carving.
    pub stock: StockConfig,
    /// Output files.
    pub output: OutputConfig,
    /// Tool table.
    pub tools: Vec<ToolEntry>,
}

impl JobConfig {
    /// Read a job file; missing sections take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// The defaults as TOML.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).context("failed to serialize default config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cncsim_stock::Cutter;

    #[test]
    fn test_empty_file_is_default() {
        let job: JobConfig = toml::from_str("").unwrap();
        assert_eq!(job, JobConfig::default());
        assert_eq!(job.output.path, PathBuf::from("path.gcode"));
    }

    #[test]
    fn test_sections_override_defaults() {
        let text = r#"
[sim]
time_slice = 0.05

[stock]
min = [0.0, 0.0, -5.0]
max = [40.0, 30.0, 0.0]
voxel_resolution = 8

[stock.default_tool]
type = "BallEndMill"
diameter = 4.0
flute_length = 10.0

[output]
path = "out/profile.ngc"

[[tools]]
id = 3
type = "FlatEndMill"
diameter = 2.0
flute_length = 8.0
"#;
        let job: JobConfig = toml::from_str(text).unwrap();
        assert_eq!(job.sim.time_slice, 0.05);
        assert_eq!(job.sim.arc_tolerance, SimConfig::default().arc_tolerance);
        assert_eq!(job.stock.max, [40.0, 30.0, 0.0]);
        assert!(job.stock.enabled);
        assert!(matches!(job.stock.default_tool, Cutter::BallEndMill { .. }));
        assert_eq!(job.output.path, PathBuf::from("out/profile.ngc"));
        assert!(job.output.write_path);
        assert_eq!(job.tools.len(), 1);
        assert_eq!(job.tools[0].id, 3);
    }

    #[test]
    fn test_default_toml_round_trips() {
        let text = JobConfig::default_toml().unwrap();
        let job: JobConfig = toml::from_str(&text).unwrap();
        assert_eq!(job, JobConfig::default());
    }

    #[test]
    fn test_load_reports_file_name() {
        let err = JobConfig::load(Path::new("/nonexistent/job.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/job.toml"));
    }
}
