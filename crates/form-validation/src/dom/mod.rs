//! Arena-backed element tree; nodes are never removed, so ids stay valid.

pub mod selector;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

pub use selector::{SelectorError, SelectorList};

/// Tag carried by the synthetic root element of every document.
pub const ROOT_TAG: &str = "#document";

/// Handle to an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("{0} does not belong to this document")]
    UnknownNode(NodeId),
    #[error("cannot append {child} under {parent}: it would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },
}

/// Event types a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Input,
}

/// Callback invoked with the document and the event target.
pub type Listener = Rc<dyn Fn(&mut Document, NodeId)>;

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    // Live value; `None` until the control is edited or assigned.
    value: Option<String>,
    user_edited: bool,
    custom_validity: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            value: None,
            user_edited: false,
            custom_validity: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

pub struct Document {
    nodes: Vec<Element>,
    listeners: HashMap<(NodeId, EventKind), Vec<Listener>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Element {
                tag: ROOT_TAG.to_string(),
                ..Element::new("")
            }],
            listeners: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    pub fn ensure(&self, node: NodeId) -> Result<(), DomError> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(DomError::UnknownNode(node))
        }
    }

    fn element(&self, node: NodeId) -> Option<&Element> {
        self.nodes.get(node.0)
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(node.0)
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Element::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    /// Moves `child` under `parent`, after any existing children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.ensure(parent)?;
        self.ensure(child)?;
        let mut ancestor = Some(parent);
        while let Some(node) = ancestor {
            if node == child {
                return Err(DomError::HierarchyRequest { parent, child });
            }
            ancestor = self.nodes[node.0].parent;
        }
        if let Some(old_parent) = self.nodes[child.0].parent.take() {
            self.nodes[old_parent.0].children.retain(|id| *id != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.tag.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node).and_then(|element| element.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.element(node)
            .map(|element| element.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(node)?);
        let position = siblings.iter().position(|id| *id == node)?;
        siblings.get(position + 1).copied()
    }

    /// Descendants of `scope` in document order, `scope` excluded.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)
            .and_then(|element| element.attributes.get(&name.to_ascii_lowercase()))
            .map(String::as_str)
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element
                .attributes
                .insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attributes.remove(&name.to_ascii_lowercase());
        }
    }

    /// Reads a `data-*` attribute by its camelCase key, e.g. `errorMessage`
    /// for `data-error-message`.
    pub fn dataset(&self, node: NodeId, key: &str) -> Option<&str> {
        self.attribute(node, &data_attribute_name(key))
    }

    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.attribute(node, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).any(|candidate| candidate == class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if class.is_empty() || self.has_class(node, class) {
            return;
        }
        let mut tokens: Vec<String> = self.classes(node).map(str::to_string).collect();
        tokens.push(class.to_string());
        self.set_attribute(node, "class", &tokens.join(" "));
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let tokens: Vec<String> = self
            .classes(node)
            .filter(|candidate| *candidate != class)
            .map(str::to_string)
            .collect();
        self.set_attribute(node, "class", &tokens.join(" "));
    }

    pub fn text_content(&self, node: NodeId) -> &str {
        self.element(node)
            .map(|element| element.text.as_str())
            .unwrap_or_default()
    }

    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        if let Some(element) = self.element_mut(node) {
            element.text = text.to_string();
        }
    }

    /// Current value of a form control: the live value once assigned,
    /// otherwise the `value` attribute (or the text of a `<textarea>`).
    pub fn value(&self, node: NodeId) -> &str {
        let Some(element) = self.element(node) else {
            return "";
        };
        if let Some(value) = &element.value {
            return value;
        }
        if element.tag == "textarea" {
            return &element.text;
        }
        element
            .attributes
            .get("value")
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Programmatic assignment; resets the user-edited flag.
    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.value = Some(value.to_string());
            element.user_edited = false;
        }
    }

    /// Whether the current value came from user input rather than script.
    pub fn is_user_edited(&self, node: NodeId) -> bool {
        self.element(node)
            .map(|element| element.user_edited)
            .unwrap_or(false)
    }

    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.has_attribute(node, "disabled")
    }

    pub fn set_disabled(&mut self, node: NodeId, disabled: bool) {
        if disabled {
            self.set_attribute(node, "disabled", "");
        } else {
            self.remove_attribute(node, "disabled");
        }
    }

    pub fn custom_validity(&self, node: NodeId) -> &str {
        self.element(node)
            .map(|element| element.custom_validity.as_str())
            .unwrap_or_default()
    }

    /// An empty message clears the custom error.
    pub fn set_custom_validity(&mut self, node: NodeId, message: &str) {
        if let Some(element) = self.element_mut(node) {
            element.custom_validity = message.to_string();
        }
    }

    pub fn query_selector(&self, scope: NodeId, selector: &SelectorList) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|node| selector.matches(self, *node))
    }

    pub fn query_selector_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect()
    }

    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        kind: EventKind,
        listener: Listener,
    ) -> Result<(), DomError> {
        self.ensure(node)?;
        self.listeners.entry((node, kind)).or_default().push(listener);
        Ok(())
    }

    pub fn listener_count(&self, node: NodeId, kind: EventKind) -> usize {
        self.listeners.get(&(node, kind)).map_or(0, Vec::len)
    }

    /// Simulates the user replacing the control's value, then runs every
    /// input listener on `node` in registration order.
    pub fn dispatch_input(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        self.ensure(node)?;
        let element = &mut self.nodes[node.0];
        element.value = Some(value.to_string());
        element.user_edited = true;

        let listeners = self
            .listeners
            .get(&(node, EventKind::Input))
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener(self, node);
        }
        Ok(())
    }
}

fn data_attribute_name(key: &str) -> String {
    let mut name = String::from("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}
