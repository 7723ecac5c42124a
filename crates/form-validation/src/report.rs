use serde_json::{Map, Value, json};

use crate::config::ValidationConfig;
use crate::constraint::{validation_message, validity};
use crate::dom::{Document, NodeId};
use crate::engine::{EngineError, error_element};

/// Overall status of the forms in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// Every form can be submitted.
    Ready,
    /// At least one form is blocked by an invalid field.
    Blocked,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Ready => "ready",
            ReportStatus::Blocked => "blocked",
        }
    }
}

/// Snapshot of one field and its error-display element.
#[derive(Debug, Clone)]
pub struct FieldReport {
    pub label: String,
    pub value: String,
    pub valid: bool,
    /// Message the constraint model produces for the current value.
    pub native_message: String,
    /// Text currently shown in the error-display element, if there is one.
    pub error_text: Option<String>,
    /// Whether the field carries the input error class.
    pub error_shown: bool,
}

#[derive(Debug, Clone)]
pub struct FormReport {
    pub label: String,
    /// `None` when the form has no submit control.
    pub submit_disabled: Option<bool>,
    pub fields: Vec<FieldReport>,
}

impl FormReport {
    pub fn blocked(&self) -> bool {
        match self.submit_disabled {
            Some(disabled) => disabled,
            None => self.fields.iter().any(|field| !field.valid),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub status: ReportStatus,
    pub forms: Vec<FormReport>,
}

/// Short human label: `name`, then `#id`, then the tag.
pub fn element_label(doc: &Document, node: NodeId) -> String {
    if let Some(name) = doc.attribute(node, "name") {
        return name.to_string();
    }
    if let Some(id) = doc.attribute(node, "id") {
        return format!("#{id}");
    }
    doc.tag(node).unwrap_or("?").to_string()
}

/// Snapshot the UI state of every configured form under `scope`.
pub fn build_report(
    doc: &Document,
    scope: NodeId,
    config: &ValidationConfig,
) -> Result<ValidationReport, EngineError> {
    doc.ensure(scope)?;
    let settings = config.compile()?;

    let forms = doc
        .query_selector_all(scope, &settings.form)
        .into_iter()
        .map(|form| {
            let fields = doc
                .query_selector_all(form, &settings.input)
                .into_iter()
                .map(|field| FieldReport {
                    label: element_label(doc, field),
                    value: doc.value(field).to_string(),
                    valid: validity(doc, field).valid(),
                    native_message: validation_message(doc, field),
                    error_text: error_element(doc, field, &settings)
                        .map(|error| doc.text_content(error).to_string()),
                    error_shown: doc.has_class(field, &settings.input_error_class),
                })
                .collect();
            FormReport {
                label: element_label(doc, form),
                submit_disabled: doc
                    .query_selector(form, &settings.submit_button)
                    .map(|button| doc.is_disabled(button)),
                fields,
            }
        })
        .collect::<Vec<_>>();

    let status = if forms.iter().any(FormReport::blocked) {
        ReportStatus::Blocked
    } else {
        ReportStatus::Ready
    };

    Ok(ValidationReport { status, forms })
}

/// Render the report as a structured JSON value.
pub fn render_json(report: &ValidationReport) -> Value {
    let forms = report
        .forms
        .iter()
        .map(|form| {
            let fields = form
                .fields
                .iter()
                .map(|field| {
                    let mut map = Map::new();
                    map.insert("label".into(), Value::String(field.label.clone()));
                    map.insert("value".into(), Value::String(field.value.clone()));
                    map.insert("valid".into(), Value::Bool(field.valid));
                    map.insert(
                        "native_message".into(),
                        Value::String(field.native_message.clone()),
                    );
                    map.insert(
                        "error_text".into(),
                        field
                            .error_text
                            .clone()
                            .map(Value::String)
                            .unwrap_or(Value::Null),
                    );
                    map.insert("error_shown".into(), Value::Bool(field.error_shown));
                    Value::Object(map)
                })
                .collect::<Vec<_>>();
            json!({
                "label": form.label,
                "submit_disabled": form.submit_disabled,
                "fields": fields,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "status": report.status.as_str(),
        "forms": forms,
    })
}

/// Render the report as human-friendly text.
pub fn render_text(report: &ValidationReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Status: {} ({} form(s))",
        report.status.as_str(),
        report.forms.len()
    ));
    for form in &report.forms {
        let submit = match form.submit_disabled {
            Some(true) => "submit disabled",
            Some(false) => "submit enabled",
            None => "no submit control",
        };
        lines.push(format!("Form {}: {}", form.label, submit));
        for field in &form.fields {
            let mut entry = format!(
                " - {} = {:?} [{}]",
                field.label,
                field.value,
                if field.valid { "valid" } else { "invalid" }
            );
            if let Some(text) = field.error_text.as_deref().filter(|text| !text.is_empty()) {
                entry.push_str(&format!(" error: {}", text));
            }
            lines.push(entry);
        }
    }
    lines.join("\n")
}
