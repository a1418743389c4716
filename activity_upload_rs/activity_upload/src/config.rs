use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::UploadError;

pub const DEFAULT_TARGET_FILENAME: &str = "activities.csv";
pub const DEFAULT_ENDPOINT: &str = "/upload-file";
pub const DEFAULT_FIELD_NAME: &str = "files";

/// What to do when the selection holds no file named like the target.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoMatchPolicy {
    /// Post anyway with an empty payload and show whatever the server says.
    Send,
    /// Skip the request and show the not-found message locally.
    Report,
}

impl Default for NoMatchPolicy {
    fn default() -> Self {
        NoMatchPolicy::Send
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UploadConfig {
    pub target_filename: String,
    pub endpoint: String,
    pub field_name: String,
    pub no_match: NoMatchPolicy,
    pub block_while_in_flight: bool,
    /// `{target}` is replaced with the target filename.
    pub not_found_message: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            target_filename: DEFAULT_TARGET_FILENAME.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            no_match: NoMatchPolicy::Send,
            block_while_in_flight: false,
            not_found_message: "File '{target}' not found in the selected directory.".to_string(),
        }
    }
}

impl UploadConfig {
    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target_filename: target.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(input: &str) -> Result<Self, UploadError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| UploadError::InvalidConfig(format!("json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(input: &str) -> Result<Self, UploadError> {
        let cfg: Self =
            toml::from_str(input).map_err(|e| UploadError::InvalidConfig(format!("toml: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a `.json` or `.toml` file, picked by extension.
    pub fn load(path: &Path) -> Result<Self, UploadError> {
        let text = fs::read_to_string(path)
            .map_err(|e| UploadError::Io(format!("{}: {e}", path.display())))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => Self::from_json_str(&text),
            "toml" => Self::from_toml_str(&text),
            other => Err(UploadError::InvalidConfig(format!(
                "unsupported config format: {other:?}"
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        if self.target_filename.is_empty() {
            return Err(UploadError::InvalidConfig(
                "target_filename must not be empty".into(),
            ));
        }
        if self.field_name.is_empty() {
            return Err(UploadError::InvalidConfig(
                "field_name must not be empty".into(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(UploadError::InvalidConfig("endpoint must not be empty".into()));
        }
        Ok(())
    }

    pub fn not_found_text(&self) -> String {
        self.not_found_message
            .replace("{target}", &self.target_filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_upload_form() {
        let cfg = UploadConfig::default();
        assert_eq!(cfg.target_filename, "activities.csv");
        assert_eq!(cfg.endpoint, "/upload-file");
        assert_eq!(cfg.field_name, "files");
        assert_eq!(cfg.no_match, NoMatchPolicy::Send);
        assert!(!cfg.block_while_in_flight);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = UploadConfig::from_json_str(r#"{"target_filename": "export.csv", "no_match": "report"}"#)
            .unwrap();
        assert_eq!(cfg.target_filename, "export.csv");
        assert_eq!(cfg.no_match, NoMatchPolicy::Report);
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn toml_config_is_accepted() {
        let cfg = UploadConfig::from_toml_str(
            "endpoint = \"/api/upload\"\nblock_while_in_flight = true\n",
        )
        .unwrap();
        assert_eq!(cfg.endpoint, "/api/upload");
        assert!(cfg.block_while_in_flight);
        assert_eq!(cfg.target_filename, DEFAULT_TARGET_FILENAME);
    }

    #[test]
    fn empty_target_is_rejected() {
        let err = UploadConfig::from_json_str(r#"{"target_filename": ""}"#).unwrap_err();
        assert!(matches!(err, UploadError::InvalidConfig(_)));
    }

    #[test]
    fn load_picks_format_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "target_filename = \"rides.csv\"").unwrap();
        let cfg = UploadConfig::load(file.path()).unwrap();
        assert_eq!(cfg.target_filename, "rides.csv");

        let yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            UploadConfig::load(yaml.path()),
            Err(UploadError::InvalidConfig(_))
        ));
    }

    #[test]
    fn not_found_text_names_target() {
        let cfg = UploadConfig::with_target("rides.csv");
        assert_eq!(
            cfg.not_found_text(),
            "File 'rides.csv' not found in the selected directory."
        );
    }
}
