//! Configuration management for the form engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (forms.toml)
//! - Environment variables (FORMS__*)
//!
//! ## Example config file (forms.toml):
//! ```toml
//! [compiler]
//! strict = false
//! warn_on_dropped_rules = true
//!
//! [messages]
//! number = "Must be a number"
//! date = "Must be a valid date"
//! boolean = "Must be true or false"
//!
//! [submit]
//! default_button_text = "Submit"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration for the form engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormsConfig {
    /// Schema compiler settings
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Messages for values that cannot be coerced to the field's type
    #[serde(default)]
    pub messages: MessageConfig,

    /// Submit control settings
    #[serde(default)]
    pub submit: SubmitConfig,
}

/// Schema compiler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Reject form definitions with lint errors in `compile_checked`
    #[serde(default)]
    pub strict: bool,

    /// Log rules that have no effect on their field's type
    #[serde(default = "default_true")]
    pub warn_on_dropped_rules: bool,
}

/// Type mismatch messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    #[serde(default = "default_number_message")]
    pub number: String,

    #[serde(default = "default_date_message")]
    pub date: String,

    #[serde(default = "default_boolean_message")]
    pub boolean: String,
}

/// Submit control configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitConfig {
    /// Label used when a form does not set `submitButtonText`
    #[serde(default = "default_button_text")]
    pub default_button_text: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_number_message() -> String {
    "Must be a number".to_string()
}

fn default_date_message() -> String {
    "Must be a valid date".to_string()
}

fn default_boolean_message() -> String {
    "Must be true or false".to_string()
}

fn default_button_text() -> String {
    "Submit".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            strict: false,
            warn_on_dropped_rules: true,
        }
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            number: default_number_message(),
            date: default_date_message(),
            boolean: default_boolean_message(),
        }
    }
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            default_button_text: default_button_text(),
        }
    }
}

impl FormsConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["forms.toml", ".forms.toml", "config/forms.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "forms") {
            let xdg_config = config_dir.config_dir().join("forms.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // FORMS__COMPILER__STRICT=true etc.
        builder = builder.add_source(
            Environment::with_prefix("FORMS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
