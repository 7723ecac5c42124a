use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use form_validation::{
    Document, EngineError, NodeId, SelectorError, SelectorList, ValidationConfig,
    clear_validation,
};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("step {step}: {source}")]
    Selector {
        step: usize,
        #[source]
        source: SelectorError,
    },
    #[error("step {step}: nothing matches '{selector}'")]
    NoMatch { step: usize, selector: String },
    #[error("step {step}: {source}")]
    Engine {
        step: usize,
        #[source]
        source: EngineError,
    },
}

/// One scripted interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ReplayStep {
    /// Type `value` into the first element matching `input`.
    Input { input: String, value: String },
    /// Reset the first form matching `clear`.
    Clear { clear: String },
}

pub fn parse_steps(json: &str) -> Result<Vec<ReplayStep>, serde_json::Error> {
    serde_json::from_str(json)
}

fn resolve(doc: &Document, step: usize, selector: &str) -> Result<NodeId, ReplayError> {
    let list = SelectorList::parse(selector)
        .map_err(|source| ReplayError::Selector { step, source })?;
    doc.query_selector(doc.root(), &list)
        .ok_or_else(|| ReplayError::NoMatch {
            step,
            selector: selector.to_string(),
        })
}

/// Applies `steps` in order; steps are numbered from 1 in errors.
pub fn apply_steps(
    doc: &mut Document,
    steps: &[ReplayStep],
    config: &ValidationConfig,
) -> Result<(), ReplayError> {
    for (index, step) in steps.iter().enumerate() {
        let number = index + 1;
        match step {
            ReplayStep::Input { input, value } => {
                let target = resolve(doc, number, input)?;
                debug!(step = number, selector = %input, "input");
                doc.dispatch_input(target, value)
                    .map_err(|source| ReplayError::Engine {
                        step: number,
                        source: source.into(),
                    })?;
            }
            ReplayStep::Clear { clear } => {
                let form = resolve(doc, number, clear)?;
                debug!(step = number, selector = %clear, "clear");
                clear_validation(doc, form, config)
                    .map_err(|source| ReplayError::Engine { step: number, source })?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_validation::{Markup, MarkupFile, enable_validation};

    fn form() -> Document {
        MarkupFile::Single(
            Markup::element("form")
                .class("popup__form")
                .child(
                    Markup::element("input")
                        .class("popup__input")
                        .attr("name", "title")
                        .attr("required", ""),
                )
                .child(Markup::element("span"))
                .child(Markup::element("button").class("popup__button")),
        )
        .build()
        .unwrap()
    }

    #[test]
    fn parses_both_step_shapes() {
        let steps = parse_steps(
            r#"[{ "input": "input[name=title]", "value": "Dawn" }, { "clear": ".popup__form" }]"#,
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                ReplayStep::Input {
                    input: "input[name=title]".into(),
                    value: "Dawn".into(),
                },
                ReplayStep::Clear {
                    clear: ".popup__form".into(),
                },
            ]
        );
    }

    #[test]
    fn applies_steps_in_order() {
        let mut doc = form();
        let config = ValidationConfig::default();
        let root = doc.root();
        enable_validation(&mut doc, root, &config).unwrap();
        let steps = vec![
            ReplayStep::Input {
                input: "input[name=title]".into(),
                value: "Dawn".into(),
            },
            ReplayStep::Clear {
                clear: "form".into(),
            },
        ];

        apply_steps(&mut doc, &steps, &config).unwrap();

        let button = doc
            .query_selector(root, &SelectorList::parse("button").unwrap())
            .unwrap();
        assert!(doc.is_disabled(button));
    }

    #[test]
    fn unmatched_selector_names_the_step() {
        let mut doc = form();
        let steps = vec![ReplayStep::Clear {
            clear: "#missing".into(),
        }];
        let err = apply_steps(&mut doc, &steps, &ValidationConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "step 1: nothing matches '#missing'");
    }
}
