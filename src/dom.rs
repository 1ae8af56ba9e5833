use std::collections::HashMap;

use crate::html::{is_void_tag, parse_html};
use crate::{Error, Result};

/// Handle to a node in a [`Dom`] arena. Handles stay valid for the lifetime
/// of the document, including after the node is detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) value: String,
    pub(crate) checked: bool,
    pub(crate) disabled: bool,
    pub(crate) readonly: bool,
    pub(crate) required: bool,
}

impl Element {
    fn new(tag_name: String, attrs: HashMap<String, String>) -> Self {
        let value = attrs.get("value").cloned().unwrap_or_default();
        let checked = attrs.contains_key("checked");
        let disabled = attrs.contains_key("disabled");
        let readonly = attrs.contains_key("readonly");
        let required = attrs.contains_key("required");
        Self {
            tag_name,
            attrs,
            value,
            checked,
            disabled,
            readonly,
            required,
        }
    }

    pub(crate) fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    fn is_input_of_type(&self, kind: &str) -> bool {
        self.is_tag("input")
            && self
                .attrs
                .get("type")
                .map(|value| value.eq_ignore_ascii_case(kind))
                .unwrap_or(false)
    }
}

/// In-memory document tree.
#[derive(Debug, Clone)]
pub struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, Vec<NodeId>>,
    generated_ids: usize,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
            generated_ids: 0,
        }
    }

    /// Parses an HTML fragment into a new document.
    pub fn parse(html: &str) -> Result<Self> {
        parse_html(html)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element_in(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let id_attr = attrs.get("id").cloned();
        let id = self.create_node(Some(parent), NodeType::Element(Element::new(tag_name, attrs)));
        if let Some(id_attr) = id_attr {
            self.index_id(&id_attr, id);
        }
        id
    }

    pub(crate) fn create_text_in(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        let element = Element::new(tag_name.to_ascii_lowercase(), HashMap::new());
        self.create_node(None, NodeType::Element(element))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.create_node(None, NodeType::Text(text.to_string()))
    }

    fn is_valid_node(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, node_id: NodeId) -> bool {
        self.element(node_id).is_some()
    }

    pub fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    fn has_tag(&self, node_id: NodeId, tag: &str) -> bool {
        self.element(node_id).map(|e| e.is_tag(tag)).unwrap_or(false)
    }

    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.nodes
            .get(node_id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_connected(&self, node_id: NodeId) -> bool {
        node_id == self.root || self.is_descendant_of(node_id, self.root)
    }

    pub(crate) fn is_descendant_of(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub(crate) fn find_ancestor_by_tag(&self, node_id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if self.has_tag(current, tag) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub fn next_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let parent = self.parent(node_id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|id| *id == node_id)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|id| self.is_element(*id))
    }

    /// Element descendants of `scope` in document order, excluding `scope`.
    pub(crate) fn element_descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(scope, &mut out);
        out
    }

    fn collect_elements(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(node_id) {
            if self.is_element(*child) {
                out.push(*child);
            }
            self.collect_elements(*child, out);
        }
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index
            .get(id)
            .and_then(|nodes| nodes.first().copied())
    }

    fn index_id(&mut self, id: &str, node_id: NodeId) {
        if id.is_empty() {
            return;
        }
        self.id_index
            .entry(id.to_string())
            .or_default()
            .push(node_id);
    }

    fn rebuild_id_index(&mut self) {
        self.id_index.clear();
        for node in self.element_descendants(self.root) {
            if let Some(id) = self.attr(node, "id") {
                self.index_id(&id, node);
            }
        }
    }

    /// Returns an id of the form `valid-mate-<n>` that no connected element
    /// currently uses.
    pub fn unique_id(&mut self) -> String {
        loop {
            self.generated_ids += 1;
            let candidate = format!("valid-mate-{}", self.generated_ids);
            if !self.id_index.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn text_content(&self, node_id: NodeId) -> String {
        match self.nodes.get(node_id.0).map(|node| &node.node_type) {
            Some(NodeType::Text(text)) => text.clone(),
            Some(_) => {
                let mut out = String::new();
                for child in self.children(node_id) {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            None => String::new(),
        }
    }

    pub fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|e| e.attrs.get(&name.to_ascii_lowercase()).cloned())
    }

    pub fn has_attr(&self, node_id: NodeId, name: &str) -> bool {
        self.element(node_id)
            .map(|e| e.attrs.contains_key(&name.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    pub fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let connected = self.is_connected(node_id);
        let lowered = name.to_ascii_lowercase();
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Dom("setAttribute target is not an element".into()))?;
        element.attrs.insert(lowered.clone(), value.to_string());

        match lowered.as_str() {
            "value" => element.value = value.to_string(),
            "checked" => element.checked = true,
            "disabled" => element.disabled = true,
            "readonly" => element.readonly = true,
            "required" => element.required = true,
            _ => {}
        }

        if lowered == "id" && connected {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        let connected = self.is_connected(node_id);
        let lowered = name.to_ascii_lowercase();
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Dom("removeAttribute target is not an element".into()))?;
        element.attrs.remove(&lowered);

        match lowered.as_str() {
            "value" => element.value.clear(),
            "checked" => element.checked = false,
            "disabled" => element.disabled = false,
            "readonly" => element.readonly = false,
            "required" => element.required = false,
            _ => {}
        }

        if lowered == "id" && connected {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub fn value(&self, node_id: NodeId) -> Result<String> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Dom("value target is not an element".into()))?;
        if element.is_tag("select") {
            return Ok(self
                .selected_options(node_id)
                .first()
                .map(|option| self.option_value(*option))
                .unwrap_or_default());
        }
        if (element.is_input_of_type("checkbox") || element.is_input_of_type("radio"))
            && !element.attrs.contains_key("value")
        {
            return Ok("on".to_string());
        }
        Ok(element.value.clone())
    }

    /// Sets the current value of a control. For `select` this selects the
    /// first option whose value matches and deselects the rest.
    pub fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        if self.has_tag(node_id, "select") {
            return self.select_option(node_id, value);
        }
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Dom("value target is not an element".into()))?;
        element.value = value.to_string();
        Ok(())
    }

    pub fn checked(&self, node_id: NodeId) -> Result<bool> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Dom("checked target is not an element".into()))?;
        Ok(element.checked)
    }

    /// Sets checkedness. Checking a radio unchecks the rest of its group.
    pub fn set_checked(&mut self, node_id: NodeId, checked: bool) -> Result<()> {
        let is_radio = self
            .element(node_id)
            .ok_or_else(|| Error::Dom("checked target is not an element".into()))?
            .is_input_of_type("radio");
        if is_radio && checked {
            for other in self.radio_group(node_id) {
                if let Some(element) = self.element_mut(other) {
                    element.checked = false;
                }
            }
        }
        if let Some(element) = self.element_mut(node_id) {
            element.checked = checked;
        }
        Ok(())
    }

    /// Radios sharing `name` and form owner with `node_id`, including itself.
    pub(crate) fn radio_group(&self, node_id: NodeId) -> Vec<NodeId> {
        let name = self.attr(node_id, "name").unwrap_or_default();
        if name.is_empty() {
            return vec![node_id];
        }
        let form = self.find_ancestor_by_tag(node_id, "form");
        self.element_descendants(self.root)
            .into_iter()
            .filter(|candidate| {
                self.element(*candidate)
                    .map(|e| e.is_input_of_type("radio"))
                    .unwrap_or(false)
                    && self.attr(*candidate, "name").unwrap_or_default() == name
                    && self.find_ancestor_by_tag(*candidate, "form") == form
            })
            .collect()
    }

    pub fn disabled(&self, node_id: NodeId) -> bool {
        self.element(node_id).map(|e| e.disabled).unwrap_or(false)
    }

    /// Disabled directly or through a disabled `fieldset` ancestor.
    pub fn is_effectively_disabled(&self, node_id: NodeId) -> bool {
        if self.disabled(node_id) {
            return true;
        }
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if self.has_tag(current, "fieldset") && self.disabled(current) {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn readonly(&self, node_id: NodeId) -> bool {
        self.element(node_id).map(|e| e.readonly).unwrap_or(false)
    }

    pub fn required(&self, node_id: NodeId) -> bool {
        self.element(node_id).map(|e| e.required).unwrap_or(false)
    }

    /// The control's `type` as a browser reports it: the normalized input
    /// type, `select-one`, `select-multiple` or `textarea`.
    pub fn input_type(&self, node_id: NodeId) -> String {
        let Some(element) = self.element(node_id) else {
            return String::new();
        };
        if element.is_tag("select") {
            return if element.attrs.contains_key("multiple") {
                "select-multiple".to_string()
            } else {
                "select-one".to_string()
            };
        }
        if element.is_tag("textarea") {
            return "textarea".to_string();
        }
        if !element.is_tag("input") {
            return String::new();
        }
        let raw = element
            .attrs
            .get("type")
            .map(|kind| kind.to_ascii_lowercase())
            .unwrap_or_default();
        match raw.as_str() {
            "button" | "checkbox" | "color" | "date" | "datetime-local" | "email" | "file"
            | "hidden" | "image" | "month" | "number" | "password" | "radio" | "range"
            | "reset" | "search" | "submit" | "tel" | "text" | "time" | "url" | "week" => raw,
            _ => "text".to_string(),
        }
    }

    pub(crate) fn select_options(&self, select_node: NodeId) -> Vec<NodeId> {
        self.element_descendants(select_node)
            .into_iter()
            .filter(|node| self.has_tag(*node, "option"))
            .collect()
    }

    /// Options currently selected. A single-select without an explicit
    /// selection falls back to its first enabled option.
    pub fn selected_options(&self, select_node: NodeId) -> Vec<NodeId> {
        let options = self.select_options(select_node);
        let selected: Vec<NodeId> = options
            .iter()
            .copied()
            .filter(|option| self.has_attr(*option, "selected"))
            .collect();
        if !selected.is_empty() || self.has_attr(select_node, "multiple") {
            return selected;
        }
        options
            .into_iter()
            .find(|option| !self.disabled(*option))
            .into_iter()
            .collect()
    }

    pub(crate) fn option_value(&self, option_node: NodeId) -> String {
        if let Some(value) = self.attr(option_node, "value") {
            return value;
        }
        self.text_content(option_node)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Selects the option of `select_node` whose value is `requested`. On a
    /// single-select every other option is deselected.
    pub fn select_option(&mut self, select_node: NodeId, requested: &str) -> Result<()> {
        if !self.has_tag(select_node, "select") {
            return Err(Error::Dom("select_option target is not a select".into()));
        }
        let multiple = self.has_attr(select_node, "multiple");
        let options = self.select_options(select_node);
        let matched = options
            .iter()
            .copied()
            .find(|option| self.option_value(*option) == requested);

        for option in options {
            let Some(element) = self.element_mut(option) else {
                continue;
            };
            if Some(option) == matched {
                element
                    .attrs
                    .insert("selected".to_string(), "true".to_string());
            } else if !multiple {
                element.attrs.remove("selected");
            }
        }
        Ok(())
    }

    pub(crate) fn initialize_form_control_values(&mut self) -> Result<()> {
        for node in self.element_descendants(self.root) {
            if self.has_tag(node, "textarea") {
                let text = self.text_content(node);
                let element = self
                    .element_mut(node)
                    .ok_or_else(|| Error::Dom("textarea target is not an element".into()))?;
                element.value = text;
            }
        }
        Ok(())
    }

    /// Keeps only the last checked radio of each group, as browsers do while
    /// parsing.
    pub(crate) fn normalize_radio_groups(&mut self) -> Result<()> {
        let checked_radios: Vec<NodeId> = self
            .element_descendants(self.root)
            .into_iter()
            .filter(|node| {
                self.element(*node)
                    .map(|e| e.is_input_of_type("radio") && e.checked)
                    .unwrap_or(false)
            })
            .collect();
        for radio in checked_radios.into_iter().rev() {
            if self.checked(radio)? {
                self.set_checked(radio, true)?;
            }
        }
        Ok(())
    }

    fn can_have_children(&self, node_id: NodeId) -> bool {
        match self.nodes.get(node_id.0).map(|node| &node.node_type) {
            Some(NodeType::Document) => true,
            Some(NodeType::Element(element)) => !is_void_tag(&element.tag_name),
            _ => false,
        }
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(old_parent) = self.parent(child) {
            self.nodes[old_parent.0].children.retain(|id| *id != child);
        }
        self.nodes[child.0].parent = None;
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId, op: &str) -> Result<()> {
        if !self.is_valid_node(parent) || !self.is_valid_node(child) {
            return Err(Error::Dom(format!("{op} node is invalid")));
        }
        if !self.can_have_children(parent) {
            return Err(Error::Dom(format!("{op} target cannot have children")));
        }
        if child == self.root || child == parent {
            return Err(Error::Dom(format!("invalid {op} node")));
        }
        // Prevent cycles: parent must not be inside child's subtree.
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::Dom(format!("{op} would create a cycle")));
            }
            cursor = self.parent(node);
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertable(parent, child, "appendChild")?;
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.rebuild_id_index();
        Ok(())
    }

    /// Inserts `child` directly after `target` among its siblings. A detached
    /// target is a no-op.
    pub fn insert_after(&mut self, target: NodeId, child: NodeId) -> Result<()> {
        let Some(parent) = self.parent(target) else {
            return Ok(());
        };
        if child == target {
            return Ok(());
        }
        self.check_insertable(parent, child, "after")?;
        self.detach(child);
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|id| *id == target)
            .ok_or_else(|| Error::Dom("after target is detached".into()))?;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos + 1, child);
        self.rebuild_id_index();
        Ok(())
    }

    /// Detaches `node_id` from its parent. Detached nodes are left alone.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<()> {
        if node_id == self.root {
            return Err(Error::Dom("cannot remove the document node".into()));
        }
        if !self.is_valid_node(node_id) {
            return Err(Error::Dom("remove target is invalid".into()));
        }
        if self.parent(node_id).is_none() {
            return Ok(());
        }
        self.detach(node_id);
        self.rebuild_id_index();
        Ok(())
    }

    /// Serializes a node. Attributes are written in name order.
    pub fn outer_html(&self, node_id: NodeId) -> String {
        let Some(node) = self.nodes.get(node_id.0) else {
            return String::new();
        };
        match &node.node_type {
            NodeType::Document => self.inner_html(node_id),
            NodeType::Text(text) => escape_text(text),
            NodeType::Element(element) => {
                let mut out = String::new();
                out.push('<');
                out.push_str(&element.tag_name);
                let mut attrs: Vec<_> = element.attrs.iter().collect();
                attrs.sort();
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(v));
                    out.push('"');
                }
                out.push('>');
                if is_void_tag(&element.tag_name) {
                    return out;
                }
                out.push_str(&self.inner_html(node_id));
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
                out
            }
        }
    }

    pub fn inner_html(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node_id) {
            out.push_str(&self.outer_html(*child));
        }
        out
    }
}

fn escape_text(src: &str) -> String {
    src.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(src: &str) -> String {
    src.replace('&', "&amp;").replace('"', "&quot;")
}
