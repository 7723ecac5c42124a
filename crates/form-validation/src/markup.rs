use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dom::{Document, DomError, NodeId};

/// JSON description of an element subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Markup {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    /// Whitespace-separated class names, merged with any `class` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Initial value of a form control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Markup>,
}

/// A markup file holds either one top-level element or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum MarkupFile {
    Single(Markup),
    Many(Vec<Markup>),
}

impl MarkupFile {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn nodes(&self) -> &[Markup] {
        match self {
            MarkupFile::Single(markup) => std::slice::from_ref(markup),
            MarkupFile::Many(nodes) => nodes,
        }
    }

    /// Builds a fresh document with the file's elements under the root.
    pub fn build(&self) -> Result<Document, DomError> {
        let mut doc = Document::new();
        let root = doc.root();
        for markup in self.nodes() {
            markup.append_to(&mut doc, root)?;
        }
        Ok(doc)
    }
}

impl Markup {
    pub fn element(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            class: None,
            text: None,
            value: None,
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn child(mut self, child: Markup) -> Self {
        self.children.push(child);
        self
    }

    /// Appends this subtree under `parent` and returns the new element.
    pub fn append_to(&self, doc: &mut Document, parent: NodeId) -> Result<NodeId, DomError> {
        let node = doc.create_element(&self.tag);
        for (name, value) in &self.attrs {
            doc.set_attribute(node, name, value);
        }
        if let Some(class) = &self.class {
            for token in class.split_whitespace() {
                doc.add_class(node, token);
            }
        }
        if let Some(text) = &self.text {
            doc.set_text_content(node, text);
        }
        if let Some(value) = &self.value {
            doc.set_value(node, value);
        }
        doc.append_child(parent, node)?;
        for child in &self.children {
            child.append_to(doc, node)?;
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_elements_in_order() {
        let file = MarkupFile::from_json(
            r#"{
                "tag": "form",
                "class": "popup__form",
                "children": [
                    { "tag": "input", "class": "popup__input", "attrs": { "required": "", "class": "wide" }, "value": "Jacques" },
                    { "tag": "span", "class": "popup__error" }
                ]
            }"#,
        )
        .unwrap();
        let doc = file.build().unwrap();
        let form = doc.children(doc.root())[0];
        let input = doc.children(form)[0];
        let error = doc.children(form)[1];

        assert!(doc.has_class(form, "popup__form"));
        assert!(doc.has_class(input, "wide"));
        assert!(doc.has_class(input, "popup__input"));
        assert!(doc.has_attribute(input, "required"));
        assert_eq!(doc.value(input), "Jacques");
        assert_eq!(doc.next_element_sibling(input), Some(error));
    }

    #[test]
    fn accepts_a_list_of_top_level_elements() {
        let file = MarkupFile::from_json(r#"[{ "tag": "form" }, { "tag": "form" }]"#).unwrap();
        assert_eq!(file.nodes().len(), 2);
        let doc = file.build().unwrap();
        assert_eq!(doc.children(doc.root()).len(), 2);
    }

    #[test]
    fn rejects_elements_without_tag() {
        assert!(MarkupFile::from_json(r#"{ "class": "popup" }"#).is_err());
    }
}
