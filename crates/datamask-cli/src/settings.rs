use std::path::Path;

use datamask_transform::{SelectConfig, TransformMode, TransformOverrides};
use serde::{Deserialize, Serialize};

use crate::CliError;

pub const DEFAULT_SETTINGS_FILE: &str = "datamask.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    pub mode: Option<TransformMode>,
    pub parse_json: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateSettings {
    pub include_empty: bool,
    pub copycat_secret_key: Option<String>,
}

/// Project settings read from `datamask.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub transform: TransformSettings,
    pub generate: GenerateSettings,
    pub select: Option<toml::Table>,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    pub fn transform_overrides(&self) -> TransformOverrides {
        TransformOverrides {
            mode: self.transform.mode,
            parse_json: self.transform.parse_json,
            hash_key: self.generate.copycat_secret_key.clone(),
        }
    }

    pub fn select_config(&self) -> Result<Option<SelectConfig>, CliError> {
        let Some(table) = &self.select else {
            return Ok(None);
        };
        let value = serde_json::to_value(table)?;
        Ok(Some(SelectConfig::try_from(value)?))
    }
}

/// Read settings from `path`; a missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<Settings, CliError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    let settings = Settings::from_toml_str(&content)?;
    tracing::debug!(path = %path.display(), "loaded settings");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamask_transform::SelectOutcome;

    #[test]
    fn parses_all_sections() {
        let settings = Settings::from_toml_str(
            r#"
[transform]
mode = "strict"
parse_json = false

[generate]
include_empty = true
copycat_secret_key = "9:21"

[select]
"$default" = false
public = true

[select.audit]
events = "structure"
"#,
        )
        .expect("settings");

        assert_eq!(settings.transform.mode, Some(TransformMode::Strict));
        assert!(settings.generate.include_empty);

        let overrides = settings.transform_overrides();
        assert_eq!(overrides.mode, Some(TransformMode::Strict));
        assert_eq!(overrides.parse_json, Some(false));
        assert_eq!(overrides.hash_key.as_deref(), Some("9:21"));

        let select = settings
            .select_config()
            .expect("valid select")
            .expect("select present");
        assert_eq!(select.resolve("public", "users"), SelectOutcome::Data);
        assert_eq!(select.resolve("audit", "events"), SelectOutcome::Structure);
        assert_eq!(select.resolve("billing", "invoices"), SelectOutcome::Skip);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml_str("").expect("settings");
        assert_eq!(settings, Settings::default());
        assert!(settings.select_config().expect("no select").is_none());
    }

    #[test]
    fn rejects_unknown_modes_and_bad_directives() {
        assert!(Settings::from_toml_str("[transform]\nmode = \"lenient\"\n").is_err());

        let settings =
            Settings::from_toml_str("[select]\npublic = \"everything\"\n").expect("toml parses");
        assert!(settings.select_config().is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("datamask-settings-that-does-not-exist.toml");
        assert_eq!(load_settings(&path).expect("defaults"), Settings::default());
    }
}
