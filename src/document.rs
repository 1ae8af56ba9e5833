use crate::Result;
use crate::dom::{Dom, NodeId};
use crate::validity::ValidityState;

/// The document operations a [`FormValidator`](crate::FormValidator) relies
/// on. [`Dom`] implements it; a host embedding another document model
/// implements it over that model instead.
///
/// The trait is object safe so custom validators can inspect fields through
/// `&dyn Document`.
pub trait Document {
    fn is_element(&self, node: NodeId) -> bool;

    /// Elements under `scope` matching `selector`, in document order.
    fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>>;

    fn by_id(&self, id: &str) -> Option<NodeId>;

    fn attr(&self, node: NodeId, name: &str) -> Option<String>;

    fn has_attr(&self, node: NodeId, name: &str) -> bool;

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()>;

    fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<()>;

    fn value(&self, node: NodeId) -> Result<String>;

    fn checked(&self, node: NodeId) -> Result<bool>;

    /// The control type as reported by the `type` property, e.g. `email`,
    /// `select-one` or `textarea`.
    fn input_type(&self, node: NodeId) -> String;

    /// Native constraint validation state.
    fn validity(&self, node: NodeId) -> Result<ValidityState>;

    fn create_element(&mut self, tag_name: &str) -> NodeId;

    fn create_text(&mut self, text: &str) -> NodeId;

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()>;

    /// Inserts `node` as the next sibling of `target`.
    fn insert_after(&mut self, target: NodeId, node: NodeId) -> Result<()>;

    fn remove_node(&mut self, node: NodeId) -> Result<()>;

    /// An element id not used anywhere in the document.
    fn unique_id(&mut self) -> String;
}

impl Document for Dom {
    fn is_element(&self, node: NodeId) -> bool {
        Dom::is_element(self, node)
    }

    fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        Dom::query_selector_all(self, scope, selector)
    }

    fn by_id(&self, id: &str) -> Option<NodeId> {
        Dom::by_id(self, id)
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        Dom::attr(self, node, name)
    }

    fn has_attr(&self, node: NodeId, name: &str) -> bool {
        Dom::has_attr(self, node, name)
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        Dom::set_attr(self, node, name, value)
    }

    fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<()> {
        Dom::remove_attr(self, node, name)
    }

    fn value(&self, node: NodeId) -> Result<String> {
        Dom::value(self, node)
    }

    fn checked(&self, node: NodeId) -> Result<bool> {
        Dom::checked(self, node)
    }

    fn input_type(&self, node: NodeId) -> String {
        Dom::input_type(self, node)
    }

    fn validity(&self, node: NodeId) -> Result<ValidityState> {
        Dom::validity(self, node)
    }

    fn create_element(&mut self, tag_name: &str) -> NodeId {
        Dom::create_element(self, tag_name)
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        Dom::create_text(self, text)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        Dom::append_child(self, parent, child)
    }

    fn insert_after(&mut self, target: NodeId, node: NodeId) -> Result<()> {
        Dom::insert_after(self, target, node)
    }

    fn remove_node(&mut self, node: NodeId) -> Result<()> {
        Dom::remove_node(self, node)
    }

    fn unique_id(&mut self) -> String {
        Dom::unique_id(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotate(document: &mut dyn Document, field: NodeId, message: &str) -> Result<NodeId> {
        let span = document.create_element("span");
        let text = document.create_text(message);
        document.append_child(span, text)?;
        document.insert_after(field, span)?;
        Ok(span)
    }

    #[test]
    fn dom_is_usable_as_a_trait_object() -> Result<()> {
        let mut dom = Dom::parse("<form><input id='a' required><input id='b'></form>")?;
        let a = Document::by_id(&dom, "a").expect("a");
        let span = annotate(&mut dom, a, "needed")?;

        assert_eq!(dom.next_element_sibling(a), Some(span));
        assert_eq!(dom.text_content(span), "needed");
        assert!(!Document::validity(&dom, a)?.valid());
        Ok(())
    }
}
