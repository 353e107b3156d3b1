use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use crate::AnalysisError;

pub const DEFAULT_FILE_NAME: &str = "CloudChamber";

/// Settings applied to the analysis backend when a recording session is booked.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Master switch; a disabled recorder never touches its backend
    #[serde_as(as = "DefaultOnNull")]
    pub enabled: bool,
    /// Output file base name, without extension
    #[serde_as(as = "DefaultOnNull")]
    pub file_name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub histo_directory: String,
    #[serde_as(as = "DefaultOnNull")]
    pub ntuple_directory: String,
    #[serde_as(as = "DefaultOnNull")]
    pub verbose_level: u8,
    #[serde_as(as = "DefaultOnNull")]
    pub ntuple_merging: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: DEFAULT_FILE_NAME.to_string(),
            histo_directory: "histo".to_string(),
            ntuple_directory: "ntuple".to_string(),
            verbose_level: 1,
            ntuple_merging: true,
        }
    }
}

impl RecorderConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, AnalysisError> {
        let raw = fs::read_to_string(path)?;
        let config: RecorderConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.file_name.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "file_name must not be empty".to_string(),
            ));
        }

        if self.file_name.contains(&['/', '\\'][..]) {
            return Err(AnalysisError::InvalidConfig(
                "file_name must not contain path separators".to_string(),
            ));
        }

        for (field, dir) in [
            ("histo_directory", &self.histo_directory),
            ("ntuple_directory", &self.ntuple_directory),
        ] {
            if Path::new(dir)
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{field} must stay inside the output directory"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cloud_chamber_layout() {
        let config = RecorderConfig::default();
        assert!(config.enabled);
        assert_eq!(config.file_name, "CloudChamber");
        assert_eq!(config.histo_directory, "histo");
        assert_eq!(config.ntuple_directory, "ntuple");
        assert_eq!(config.verbose_level, 1);
        assert!(config.ntuple_merging);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_and_null_fields_fall_back_to_defaults() {
        let config: RecorderConfig =
            serde_json::from_str(r#"{ "enabled": false, "file_name": null }"#).expect("parse");
        assert!(!config.enabled);
        assert_eq!(config.file_name, "CloudChamber");
        assert_eq!(config.ntuple_directory, "ntuple");
    }

    #[test]
    fn rejects_bad_names() {
        let empty = RecorderConfig {
            file_name: "  ".to_string(),
            ..RecorderConfig::default()
        };
        assert!(empty.validate().is_err());

        let nested = RecorderConfig {
            file_name: "runs/CloudChamber".to_string(),
            ..RecorderConfig::default()
        };
        assert!(nested.validate().is_err());

        let escaping = RecorderConfig {
            histo_directory: "../histo".to_string(),
            ..RecorderConfig::default()
        };
        assert!(escaping.validate().is_err());
    }
}
