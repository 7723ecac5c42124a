#![allow(missing_docs)]

pub mod config;
pub mod constraint;
pub mod dom;
pub mod engine;
pub mod markup;
pub mod report;

pub use config::{CompiledConfig, ConfigError, ValidationConfig};
pub use constraint::{ValidityState, check_validity, validation_message, validity, will_validate};
pub use dom::{Document, DomError, EventKind, Listener, NodeId, SelectorError, SelectorList};
pub use engine::{EngineError, clear_validation, enable_validation};
pub use markup::{Markup, MarkupFile};
pub use report::{
    FieldReport, FormReport, ReportStatus, ValidationReport, build_report, element_label,
    render_json, render_text,
};
