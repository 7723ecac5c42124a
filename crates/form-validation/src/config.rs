use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::{SelectorError, SelectorList};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse validation config: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid {field}: {source}")]
    Selector {
        field: &'static str,
        #[source]
        source: SelectorError,
    },
    #[error("{field} must be a single class name, got '{value}'")]
    Class { field: &'static str, value: String },
}

/// Selectors and class names that drive live validation.
///
/// Field names follow the camelCase keys used by the page script; any key
/// missing from a config file falls back to the gallery popup defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationConfig {
    /// Containers treated as forms.
    pub form_selector: String,
    /// Validable fields within a form.
    pub input_selector: String,
    /// The form's submit control.
    pub submit_button_selector: String,
    /// Applied to the submit control while the form is invalid.
    pub inactive_button_class: String,
    /// Applied to an invalid field.
    pub input_error_class: String,
    /// Applied to a field's error-display element while it shows a message.
    pub error_class: String,
    /// Reject forms whose markup cannot be wired (no submit control, or a
    /// field without a following error-display element) instead of
    /// degrading silently.
    pub strict_markup: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            form_selector: ".popup__form".into(),
            input_selector: ".popup__input".into(),
            submit_button_selector: ".popup__button".into(),
            inactive_button_class: "popup__button_disabled".into(),
            input_error_class: "popup__input_type_error".into(),
            error_class: "popup__error_visible".into(),
            strict_markup: false,
        }
    }
}

/// A [`ValidationConfig`] with its selectors parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledConfig {
    pub form: SelectorList,
    pub input: SelectorList,
    pub submit_button: SelectorList,
    pub inactive_button_class: String,
    pub input_error_class: String,
    pub error_class: String,
    pub strict_markup: bool,
}

impl ValidationConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(ConfigError::Parse)
    }

    pub fn compile(&self) -> Result<CompiledConfig, ConfigError> {
        Ok(CompiledConfig {
            form: selector("formSelector", &self.form_selector)?,
            input: selector("inputSelector", &self.input_selector)?,
            submit_button: selector("submitButtonSelector", &self.submit_button_selector)?,
            inactive_button_class: class("inactiveButtonClass", &self.inactive_button_class)?,
            input_error_class: class("inputErrorClass", &self.input_error_class)?,
            error_class: class("errorClass", &self.error_class)?,
            strict_markup: self.strict_markup,
        })
    }
}

fn selector(field: &'static str, raw: &str) -> Result<SelectorList, ConfigError> {
    SelectorList::parse(raw).map_err(|source| ConfigError::Selector { field, source })
}

fn class(field: &'static str, raw: &str) -> Result<String, ConfigError> {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return Err(ConfigError::Class {
            field,
            value: raw.to_string(),
        });
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = ValidationConfig::from_json(
            r#"{ "formSelector": ".card-form", "strictMarkup": true }"#,
        )
        .unwrap();
        assert_eq!(config.form_selector, ".card-form");
        assert_eq!(config.input_selector, ".popup__input");
        assert!(config.strict_markup);
    }

    #[test]
    fn blank_input_yields_defaults() {
        assert_eq!(
            ValidationConfig::from_json("  ").unwrap(),
            ValidationConfig::default()
        );
    }

    #[test]
    fn compile_reports_the_offending_field() {
        let config = ValidationConfig {
            submit_button_selector: "button:last-child".into(),
            ..ValidationConfig::default()
        };
        let err = config.compile().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Selector {
                field: "submitButtonSelector",
                ..
            }
        ));
        assert!(err.to_string().starts_with("invalid submitButtonSelector"));
    }

    #[test]
    fn compile_rejects_multi_token_classes() {
        let config = ValidationConfig {
            error_class: "popup__error visible".into(),
            ..ValidationConfig::default()
        };
        assert!(matches!(
            config.compile(),
            Err(ConfigError::Class {
                field: "errorClass",
                ..
            })
        ));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(ValidationConfig::default()).unwrap();
        assert_eq!(value["submitButtonSelector"], ".popup__button");
        assert_eq!(value["inactiveButtonClass"], "popup__button_disabled");
    }
}
