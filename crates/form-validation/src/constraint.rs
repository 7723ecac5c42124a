//! HTML constraint validation for text-like controls; uncompilable `pattern`s are ignored.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::dom::{Document, NodeId};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email grammar is a valid regex")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:\S+$").expect("url grammar is a valid regex")
});

const STEP_EPSILON: f64 = 1e-9;

/// Individual constraint flags for a control, as the DOM `ValidityState`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityState {
    pub value_missing: bool,
    pub type_mismatch: bool,
    pub pattern_mismatch: bool,
    pub too_long: bool,
    pub too_short: bool,
    pub range_underflow: bool,
    pub range_overflow: bool,
    pub step_mismatch: bool,
    pub bad_input: bool,
    pub custom_error: bool,
}

impl ValidityState {
    pub fn valid(&self) -> bool {
        !(self.value_missing
            || self.type_mismatch
            || self.pattern_mismatch
            || self.too_long
            || self.too_short
            || self.range_underflow
            || self.range_overflow
            || self.step_mismatch
            || self.bad_input
            || self.custom_error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlKind {
    Text,
    Email,
    Url,
    Number,
}

/// Whether `node` takes part in constraint validation at all.
pub fn will_validate(doc: &Document, node: NodeId) -> bool {
    let Some(tag) = doc.tag(node) else {
        return false;
    };
    if tag != "input" && tag != "textarea" {
        return false;
    }
    if doc.is_disabled(node) || doc.has_attribute(node, "readonly") {
        return false;
    }
    if in_disabled_fieldset(doc, node) {
        return false;
    }
    !matches!(
        input_type(doc, node).as_str(),
        "hidden" | "submit" | "button" | "reset" | "image"
    )
}

fn in_disabled_fieldset(doc: &Document, node: NodeId) -> bool {
    let mut current = doc.parent(node);
    while let Some(ancestor) = current {
        if doc.tag(ancestor) == Some("fieldset") && doc.is_disabled(ancestor) {
            return true;
        }
        current = doc.parent(ancestor);
    }
    false
}

fn input_type(doc: &Document, node: NodeId) -> String {
    doc.attribute(node, "type")
        .unwrap_or("text")
        .trim()
        .to_ascii_lowercase()
}

fn control_kind(doc: &Document, node: NodeId) -> ControlKind {
    if doc.tag(node) == Some("textarea") {
        return ControlKind::Text;
    }
    match input_type(doc, node).as_str() {
        "email" => ControlKind::Email,
        "url" => ControlKind::Url,
        "number" | "range" => ControlKind::Number,
        _ => ControlKind::Text,
    }
}

fn numeric_attribute(doc: &Document, node: NodeId, name: &str) -> Option<f64> {
    doc.attribute(node, name)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

fn length_attribute(doc: &Document, node: NodeId, name: &str) -> Option<usize> {
    doc.attribute(node, name)
        .and_then(|raw| raw.trim().parse::<usize>().ok())
}

fn parse_number(raw: &str) -> Option<f64> {
    if raw.starts_with('+') || raw.trim() != raw {
        return None;
    }
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn is_valid_email(doc: &Document, node: NodeId, value: &str) -> bool {
    if doc.has_attribute(node, "multiple") {
        value.split(',').all(|part| EMAIL.is_match(part.trim()))
    } else {
        EMAIL.is_match(value)
    }
}

/// Rewrites `\d`, `\w` and `\b` (and their negations) to their ASCII
/// definitions. `\s` stays Unicode-aware, as it is in HTML patterns.
fn ascii_classes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    let mut class_depth = 0usize;
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('d') => out.push_str("[0-9]"),
                Some('D') => out.push_str("[^0-9]"),
                Some('w') => out.push_str("[0-9A-Za-z_]"),
                Some('W') => out.push_str("[^0-9A-Za-z_]"),
                Some('b') if class_depth == 0 => out.push_str("(?-u:\\b)"),
                Some('B') if class_depth == 0 => out.push_str("(?-u:\\B)"),
                Some(escaped) => {
                    out.push('\\');
                    out.push(escaped);
                }
                None => out.push('\\'),
            },
            '[' => {
                class_depth += 1;
                out.push(c);
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn matches_pattern(pattern: &str, value: &str) -> Option<bool> {
    let source = format!("^(?:{})$", ascii_classes(pattern));
    match RegexBuilder::new(&source).build() {
        Ok(regex) => Some(regex.is_match(value)),
        Err(err) => {
            debug!(%pattern, error = %err, "pattern attribute does not compile; ignoring it");
            None
        }
    }
}

fn step_mismatch(doc: &Document, node: NodeId, number: f64) -> bool {
    let step = match doc.attribute(node, "step") {
        Some(raw) if raw.trim().eq_ignore_ascii_case("any") => return false,
        Some(_) => match numeric_attribute(doc, node, "step") {
            Some(step) if step > 0.0 => step,
            _ => 1.0,
        },
        None => 1.0,
    };
    let base = numeric_attribute(doc, node, "min")
        .or_else(|| numeric_attribute(doc, node, "value"))
        .unwrap_or(0.0);
    let steps = (number - base) / step;
    (steps - steps.round()).abs() > STEP_EPSILON
}

/// Computes the validity flags for `node` from its current value.
pub fn validity(doc: &Document, node: NodeId) -> ValidityState {
    let mut state = ValidityState::default();
    if !will_validate(doc, node) {
        return state;
    }

    state.custom_error = !doc.custom_validity(node).is_empty();

    let value = doc.value(node);
    if value.is_empty() {
        state.value_missing = doc.has_attribute(node, "required");
        return state;
    }

    let kind = control_kind(doc, node);
    match kind {
        ControlKind::Email => state.type_mismatch = !is_valid_email(doc, node, value),
        ControlKind::Url => state.type_mismatch = !URL.is_match(value),
        ControlKind::Number => match parse_number(value) {
            Some(number) => {
                if let Some(min) = numeric_attribute(doc, node, "min") {
                    state.range_underflow = number < min;
                }
                if let Some(max) = numeric_attribute(doc, node, "max") {
                    state.range_overflow = number > max;
                }
                state.step_mismatch = step_mismatch(doc, node, number);
            }
            None => state.bad_input = true,
        },
        ControlKind::Text => {}
    }

    if kind != ControlKind::Number
        && let Some(pattern) = doc.attribute(node, "pattern")
    {
        state.pattern_mismatch = matches_pattern(pattern, value) == Some(false);
    }

    // Length limits only apply to values the user typed.
    if kind != ControlKind::Number && doc.is_user_edited(node) {
        let length = value.chars().count();
        if let Some(min) = length_attribute(doc, node, "minlength") {
            state.too_short = length < min;
        }
        if let Some(max) = length_attribute(doc, node, "maxlength") {
            state.too_long = length > max;
        }
    }

    state
}

pub fn check_validity(doc: &Document, node: NodeId) -> bool {
    validity(doc, node).valid()
}

/// The message a browser would show for the first failing constraint, or an
/// empty string when the control is valid.
pub fn validation_message(doc: &Document, node: NodeId) -> String {
    let state = validity(doc, node);
    let value = doc.value(node);
    if state.custom_error {
        return doc.custom_validity(node).to_string();
    }
    if state.value_missing {
        return "Please fill out this field.".into();
    }
    if state.type_mismatch {
        return match control_kind(doc, node) {
            ControlKind::Email if !value.contains('@') => format!(
                "Please include an '@' in the email address. '{value}' is missing an '@'."
            ),
            ControlKind::Email => "Please enter an email address.".into(),
            _ => "Please enter a URL.".into(),
        };
    }
    if state.bad_input {
        return "Please enter a number.".into();
    }
    if state.range_underflow {
        let min = doc.attribute(node, "min").unwrap_or_default().trim();
        return format!("Value must be greater than or equal to {min}.");
    }
    if state.range_overflow {
        let max = doc.attribute(node, "max").unwrap_or_default().trim();
        return format!("Value must be less than or equal to {max}.");
    }
    if state.step_mismatch {
        return "Please enter a valid value.".into();
    }
    let length = value.chars().count();
    if state.too_short {
        let min = length_attribute(doc, node, "minlength").unwrap_or_default();
        return format!(
            "Please lengthen this text to {min} characters or more (you are currently using {length} {}).",
            plural_characters(length)
        );
    }
    if state.too_long {
        let max = length_attribute(doc, node, "maxlength").unwrap_or_default();
        return format!(
            "Please shorten this text to {max} characters or less (you are currently using {length} {}).",
            plural_characters(length)
        );
    }
    if state.pattern_mismatch {
        return "Please match the requested format.".into();
    }
    String::new()
}

fn plural_characters(count: usize) -> &'static str {
    if count == 1 { "character" } else { "characters" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(attrs: &[(&str, &str)]) -> (Document, NodeId) {
        let mut doc = Document::new();
        let node = doc.create_element("input");
        for (name, value) in attrs {
            doc.set_attribute(node, name, value);
        }
        doc.append_child(doc.root(), node).unwrap();
        (doc, node)
    }

    fn typed(attrs: &[(&str, &str)], value: &str) -> (Document, NodeId) {
        let (mut doc, node) = input(attrs);
        doc.dispatch_input(node, value).unwrap();
        (doc, node)
    }

    #[test]
    fn required_empty_value_is_missing() {
        let (doc, node) = input(&[("required", "")]);
        let state = validity(&doc, node);
        assert!(state.value_missing);
        assert!(!state.valid());
        assert_eq!(validation_message(&doc, node), "Please fill out this field.");
    }

    #[test]
    fn optional_empty_value_is_valid_even_with_pattern() {
        let (doc, node) = input(&[("pattern", r"\d+")]);
        assert!(check_validity(&doc, node));
        assert_eq!(validation_message(&doc, node), "");
    }

    #[test]
    fn pattern_must_match_whole_value() {
        let (doc, node) = typed(&[("pattern", r"\d+")], "12a");
        assert!(validity(&doc, node).pattern_mismatch);
        assert_eq!(
            validation_message(&doc, node),
            "Please match the requested format."
        );

        let (doc, node) = typed(&[("pattern", r"\d+")], "123");
        assert!(check_validity(&doc, node));
    }

    #[test]
    fn pattern_digit_class_is_ascii_only() {
        let (doc, node) = typed(&[("pattern", r"^\d+$")], "٣٤٥");
        assert!(validity(&doc, node).pattern_mismatch);

        let (doc, node) = typed(&[("pattern", r"[\w.]+")], "café");
        assert!(validity(&doc, node).pattern_mismatch);

        let (doc, node) = typed(&[("pattern", r"[\w.]+")], "cafe.au_lait");
        assert!(check_validity(&doc, node));
    }

    #[test]
    fn escaped_backslash_is_not_a_class() {
        assert_eq!(ascii_classes(r"\\d"), r"\\d");
        assert_eq!(ascii_classes(r"\bx\d[\b]"), r"(?-u:\b)x[0-9][\b]");
    }

    #[test]
    fn invalid_pattern_is_ignored() {
        let (doc, node) = typed(&[("pattern", "(")], "anything");
        assert!(check_validity(&doc, node));
    }

    #[test]
    fn length_limits_apply_to_user_edits_only() {
        let attrs = [("minlength", "2"), ("maxlength", "4")];
        let (doc, node) = typed(&attrs, "a");
        assert!(validity(&doc, node).too_short);
        assert_eq!(
            validation_message(&doc, node),
            "Please lengthen this text to 2 characters or more (you are currently using 1 character)."
        );

        let (doc, node) = typed(&attrs, "абвгд");
        assert!(validity(&doc, node).too_long);

        let (mut doc, node) = input(&attrs);
        doc.set_value(node, "a");
        assert!(check_validity(&doc, node));
    }

    #[test]
    fn email_and_url_types_check_syntax() {
        let (doc, node) = typed(&[("type", "email")], "jacques.example.com");
        assert!(validity(&doc, node).type_mismatch);
        assert!(validation_message(&doc, node).contains("is missing an '@'"));

        let (doc, node) = typed(&[("type", "email")], "jacques@example.com");
        assert!(check_validity(&doc, node));

        let (doc, node) = typed(&[("type", "url")], "not a url");
        assert_eq!(validation_message(&doc, node), "Please enter a URL.");

        let (doc, node) = typed(&[("type", "url")], "https://pictures.example/a.jpg");
        assert!(check_validity(&doc, node));
    }

    #[test]
    fn number_type_checks_range_and_step() {
        let attrs = [("type", "number"), ("min", "1"), ("max", "10"), ("step", "0.5")];
        let (doc, node) = typed(&attrs, "0");
        assert!(validity(&doc, node).range_underflow);
        assert_eq!(
            validation_message(&doc, node),
            "Value must be greater than or equal to 1."
        );

        let (doc, node) = typed(&attrs, "11");
        assert!(validity(&doc, node).range_overflow);

        let (doc, node) = typed(&attrs, "2.25");
        assert!(validity(&doc, node).step_mismatch);

        let (doc, node) = typed(&attrs, "2.5");
        assert!(check_validity(&doc, node));

        let (doc, node) = typed(&attrs, "two");
        assert!(validity(&doc, node).bad_input);
        assert_eq!(validation_message(&doc, node), "Please enter a number.");
    }

    #[test]
    fn custom_validity_takes_precedence() {
        let (mut doc, node) = typed(&[("required", "")], "");
        doc.set_custom_validity(node, "Pick another name");
        assert!(validity(&doc, node).custom_error);
        assert_eq!(validation_message(&doc, node), "Pick another name");
        doc.set_custom_validity(node, "");
        assert_eq!(validation_message(&doc, node), "Please fill out this field.");
    }

    #[test]
    fn barred_controls_are_always_valid() {
        let (doc, node) = input(&[("required", ""), ("disabled", "")]);
        assert!(!will_validate(&doc, node));
        assert!(check_validity(&doc, node));

        let (doc, node) = input(&[("required", ""), ("type", "hidden")]);
        assert!(check_validity(&doc, node));

        let mut doc = Document::new();
        let button = doc.create_element("button");
        doc.set_attribute(button, "required", "");
        assert!(check_validity(&doc, button));
    }
}
