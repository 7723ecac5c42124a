//! Live validation: per-field error display and submit-control gating.

use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{CompiledConfig, ConfigError, ValidationConfig};
use crate::constraint::{validation_message, validity};
use crate::dom::{Document, DomError, EventKind, NodeId};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("form {form} has no submit control matching '{selector}'")]
    MissingSubmitControl { form: NodeId, selector: String },
    #[error("field {field} in form {form} is not followed by an error-display element")]
    MissingErrorElement { form: NodeId, field: NodeId },
}

/// Fields and submit control of one form, resolved when it is wired.
#[derive(Debug)]
struct FormBinding {
    fields: Vec<NodeId>,
    button: Option<NodeId>,
    settings: Rc<CompiledConfig>,
}

impl FormBinding {
    fn collect(
        doc: &Document,
        form: NodeId,
        settings: &Rc<CompiledConfig>,
    ) -> Result<Self, EngineError> {
        let fields = doc.query_selector_all(form, &settings.input);
        let button = doc.query_selector(form, &settings.submit_button);

        if button.is_none() {
            if settings.strict_markup {
                return Err(EngineError::MissingSubmitControl {
                    form,
                    selector: settings.submit_button.to_string(),
                });
            }
            debug!(%form, "form has no submit control; toggling is a no-op");
        }

        for &field in &fields {
            if error_element(doc, field, settings).is_none() {
                if settings.strict_markup {
                    return Err(EngineError::MissingErrorElement { form, field });
                }
                debug!(%form, %field, "field has no error-display sibling");
            }
        }

        Ok(Self {
            fields,
            button,
            settings: Rc::clone(settings),
        })
    }
}

/// The element showing `field`'s error text: its next sibling, unless that
/// sibling is itself a field or a submit control.
pub(crate) fn error_element(
    doc: &Document,
    field: NodeId,
    settings: &CompiledConfig,
) -> Option<NodeId> {
    doc.next_element_sibling(field).filter(|sibling| {
        !settings.input.matches(doc, *sibling) && !settings.submit_button.matches(doc, *sibling)
    })
}

fn show_input_error(doc: &mut Document, field: NodeId, settings: &CompiledConfig) {
    let state = validity(doc, field);
    let message = match doc.dataset(field, "errorMessage") {
        Some(custom) if state.pattern_mismatch => custom.to_string(),
        _ => validation_message(doc, field),
    };

    doc.add_class(field, &settings.input_error_class);
    if let Some(error) = error_element(doc, field, settings) {
        doc.set_text_content(error, &message);
        doc.add_class(error, &settings.error_class);
    }
}

fn hide_input_error(doc: &mut Document, field: NodeId, settings: &CompiledConfig) {
    doc.remove_class(field, &settings.input_error_class);
    if let Some(error) = error_element(doc, field, settings) {
        doc.set_text_content(error, "");
        doc.remove_class(error, &settings.error_class);
    }
}

fn check_input_validity(doc: &mut Document, field: NodeId, settings: &CompiledConfig) {
    if validity(doc, field).valid() {
        hide_input_error(doc, field, settings);
    } else {
        show_input_error(doc, field, settings);
    }
}

fn has_invalid_input(doc: &Document, fields: &[NodeId]) -> bool {
    fields.iter().any(|field| !validity(doc, *field).valid())
}

fn disable_submit_button(doc: &mut Document, button: NodeId, settings: &CompiledConfig) {
    doc.add_class(button, &settings.inactive_button_class);
    doc.set_disabled(button, true);
}

fn enable_submit_button(doc: &mut Document, button: NodeId, settings: &CompiledConfig) {
    doc.remove_class(button, &settings.inactive_button_class);
    doc.set_disabled(button, false);
}

fn toggle_button_state(doc: &mut Document, binding: &FormBinding) {
    let Some(button) = binding.button else {
        return;
    };
    if has_invalid_input(doc, &binding.fields) {
        disable_submit_button(doc, button, &binding.settings);
    } else {
        enable_submit_button(doc, button, &binding.settings);
    }
}

fn set_event_listeners(doc: &mut Document, binding: FormBinding) -> Result<(), EngineError> {
    let binding = Rc::new(binding);
    toggle_button_state(doc, &binding);

    for &field in &binding.fields {
        let binding = Rc::clone(&binding);
        doc.add_event_listener(
            field,
            EventKind::Input,
            Rc::new(move |doc: &mut Document, target: NodeId| {
                trace!(field = %target, "input event");
                check_input_validity(doc, target, &binding.settings);
                toggle_button_state(doc, &binding);
            }),
        )?;
    }
    Ok(())
}

/// Wires live validation into every form matching `config.form_selector`
/// under `scope` and applies the initial submit-control state.
///
/// Returns the number of forms wired. Forms are resolved before any listener
/// is installed, so a strict-markup failure leaves the document untouched.
/// Calling this twice on the same forms registers the listeners twice.
pub fn enable_validation(
    doc: &mut Document,
    scope: NodeId,
    config: &ValidationConfig,
) -> Result<usize, EngineError> {
    doc.ensure(scope)?;
    let settings = Rc::new(config.compile()?);

    let bindings = doc
        .query_selector_all(scope, &settings.form)
        .into_iter()
        .map(|form| FormBinding::collect(doc, form, &settings))
        .collect::<Result<Vec<_>, _>>()?;

    let count = bindings.len();
    for binding in bindings {
        set_event_listeners(doc, binding)?;
    }
    debug!(forms = count, selector = %settings.form, "validation enabled");
    Ok(count)
}

/// Resets `form` to a pristine look: no error text, no error classes, and a
/// disabled submit control, whatever the current field values are.
pub fn clear_validation(
    doc: &mut Document,
    form: NodeId,
    config: &ValidationConfig,
) -> Result<(), EngineError> {
    doc.ensure(form)?;
    let settings = Rc::new(config.compile()?);
    let binding = FormBinding::collect(doc, form, &settings)?;

    for &field in &binding.fields {
        hide_input_error(doc, field, &settings);
    }
    if let Some(button) = binding.button {
        disable_submit_button(doc, button, &settings);
    }
    debug!(%form, fields = binding.fields.len(), "validation cleared");
    Ok(())
}
