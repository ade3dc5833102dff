use std::fmt;
use std::vec;

use indexmap::IndexMap;

/// Index of a node's slot in its owning [Tree]. Slots are never reused while
/// the tree lives, so an id stays valid (if possibly unlinked) for as long as
/// anything might still hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub text: Option<String>,
    /* insertion order is significant for round-trip fidelity */
    pub attributes: IndexMap<String, String>,

    children: vec::Vec<NodeId>,
    parent: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTag,
    EmptyAttributeKey,
    DuplicateAttributeKey(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyTag => write!(f, "element tag must not be empty"),
            ValidationError::EmptyAttributeKey => write!(f, "attribute key must not be empty"),
            ValidationError::DuplicateAttributeKey(key) => write!(f, "attribute '{}' already exists", key),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    /// Old and new key were identical; nothing happened.
    Unchanged,
}

/// An arena of XML elements. All mutations are in place and synchronous;
/// nothing here publishes change notifications, that's the caller's job so
/// one user gesture maps to exactly one notification.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: vec::Vec<Node>,
}

impl Node {
    fn new(tag: String, text: Option<String>) -> Node {
        Node {
            tag,
            text,
            attributes: IndexMap::new(),
            children: vec::Vec::new(),
            parent: None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

impl Tree {
    pub fn new(root_tag: &str) -> Tree {
        Tree {
            slots: vec![Node::new(root_tag.to_string(), None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.slots[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slots[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.slots[id.0].children.is_empty()
    }

    pub fn has_grandchildren(&self, id: NodeId) -> bool {
        self.slots[id.0].children.iter().any(|child| !self.slots[child.0].children.is_empty())
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.slots[id.0].text = Some(text.to_string());
    }

    pub fn set_attribute(&mut self, id: NodeId, key: &str, value: &str) -> Result<(), ValidationError> {
        if key.is_empty() {
            return Err(ValidationError::EmptyAttributeKey);
        }

        self.slots[id.0].attributes.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Moves an attribute's value from one key to another, preserving the
    /// value. The renamed key lands at the end of the attribute order, same
    /// as a remove-then-insert. Refuses to clobber a different existing key.
    pub fn rename_attribute(&mut self, id: NodeId, old: &str, new: &str) -> Result<RenameOutcome, ValidationError> {
        if new.is_empty() {
            return Err(ValidationError::EmptyAttributeKey);
        }

        if old == new {
            return Ok(RenameOutcome::Unchanged);
        }

        let attributes = &mut self.slots[id.0].attributes;

        if attributes.contains_key(new) {
            return Err(ValidationError::DuplicateAttributeKey(new.to_string()));
        }

        let value = attributes.shift_remove(old).unwrap_or_default();
        attributes.insert(new.to_string(), value);

        Ok(RenameOutcome::Renamed)
    }

    pub fn remove_attribute(&mut self, id: NodeId, key: &str) -> Option<String> {
        self.slots[id.0].attributes.shift_remove(key)
    }

    pub fn append_child(&mut self, parent: NodeId, tag: &str, text: Option<&str>) -> Result<NodeId, ValidationError> {
        if tag.is_empty() {
            return Err(ValidationError::EmptyTag);
        }

        let mut node = Node::new(tag.to_string(), text.map(str::to_string));
        node.parent = Some(parent);

        let id = NodeId(self.slots.len());
        self.slots.push(node);
        self.slots[parent.0].children.push(id);

        Ok(id)
    }

    /// Copies a subtree into fresh slots. The copy is unlinked; follow up
    /// with [Tree::append_node] to place it.
    pub fn clone_subtree(&mut self, src: NodeId) -> NodeId {
        let mut copy = self.slots[src.0].clone();
        copy.parent = None;
        copy.children = vec::Vec::new();

        let id = NodeId(self.slots.len());
        self.slots.push(copy);

        for child in self.slots[src.0].children.clone() {
            let child_copy = self.clone_subtree(child);
            self.append_node(id, child_copy);
        }

        id
    }

    /// Links an unparented node under `parent`.
    pub fn append_node(&mut self, parent: NodeId, id: NodeId) {
        debug_assert!(self.slots[id.0].parent.is_none());

        self.slots[id.0].parent = Some(parent);
        self.slots[parent.0].children.push(id);
    }

    /// Unlinks a node from its parent. The slot (and its subtree's slots)
    /// remain allocated so stale ids can't alias a different node. Returns
    /// false for the root, which has no parent to unlink from.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let parent = match self.slots[id.0].parent {
            Some(parent) => parent,
            None => return false,
        };

        self.slots[parent.0].children.retain(|child| *child != id);
        self.slots[id.0].parent = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn keys(tree: &Tree, id: NodeId) -> Vec<&str> {
        tree.node(id).attributes.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_attribute_sequence_has_unique_keys() {
        let mut tree = Tree::new("root");
        let root = tree.root();

        tree.set_attribute(root, "a", "1").unwrap();
        tree.set_attribute(root, "b", "2").unwrap();
        tree.set_attribute(root, "a", "3").unwrap();
        tree.rename_attribute(root, "b", "c").unwrap();
        tree.remove_attribute(root, "a");
        tree.set_attribute(root, "c", "4").unwrap();

        assert_eq!(keys(&tree, root), vec!["c"]);
        assert_eq!(tree.node(root).attributes.get("c").map(String::as_str), Some("4"));
    }

    #[test]
    fn test_rename_to_existing_key_is_rejected() {
        let mut tree = Tree::new("root");
        let root = tree.root();

        tree.set_attribute(root, "a", "1").unwrap();
        tree.set_attribute(root, "b", "2").unwrap();

        let before = tree.node(root).attributes.clone();
        assert_matches!(tree.rename_attribute(root, "a", "b"), Err(ValidationError::DuplicateAttributeKey(_)));
        assert_eq!(tree.node(root).attributes, before);
    }

    #[test]
    fn test_rename_to_same_key_is_noop() {
        let mut tree = Tree::new("root");
        let root = tree.root();

        tree.set_attribute(root, "a", "1").unwrap();

        let before = tree.node(root).attributes.clone();
        assert_eq!(tree.rename_attribute(root, "a", "a"), Ok(RenameOutcome::Unchanged));
        assert_eq!(tree.node(root).attributes, before);
    }

    #[test]
    fn test_rename_moves_key_to_end_of_order() {
        let mut tree = Tree::new("root");
        let root = tree.root();

        tree.set_attribute(root, "a", "1").unwrap();
        tree.set_attribute(root, "b", "2").unwrap();
        tree.set_attribute(root, "c", "3").unwrap();

        tree.rename_attribute(root, "a", "z").unwrap();
        assert_eq!(keys(&tree, root), vec!["b", "c", "z"]);
        assert_eq!(tree.node(root).attributes.get("z").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_empty_keys_and_tags_are_rejected() {
        let mut tree = Tree::new("root");
        let root = tree.root();

        assert_matches!(tree.set_attribute(root, "", "v"), Err(ValidationError::EmptyAttributeKey));
        assert_matches!(tree.rename_attribute(root, "a", ""), Err(ValidationError::EmptyAttributeKey));
        assert_matches!(tree.append_child(root, "", None), Err(ValidationError::EmptyTag));
    }

    #[test]
    fn test_clone_subtree_is_a_deep_copy() {
        let mut tree = Tree::new("root");
        let root = tree.root();

        let title = tree.append_child(root, "title", Some("Hello")).unwrap();
        tree.append_child(title, "sub", None).unwrap();
        tree.set_attribute(title, "lang", "en").unwrap();

        let copy = tree.clone_subtree(title);
        tree.append_node(root, copy);

        tree.set_text(title, "changed");

        assert_eq!(tree.node(copy).tag, "title");
        assert_eq!(tree.node(copy).text.as_deref(), Some("Hello"));
        assert_eq!(tree.node(copy).attributes.get("lang").map(String::as_str), Some("en"));
        assert_eq!(tree.children(copy).len(), 1);
        assert_eq!(tree.parent(copy), Some(root));
        assert_eq!(tree.children(root), &[title, copy]);
    }

    #[test]
    fn test_detach_unlinks_but_keeps_slot() {
        let mut tree = Tree::new("root");
        let root = tree.root();

        let child = tree.append_child(root, "child", None).unwrap();
        assert!(tree.detach(child));

        assert!(tree.children(root).is_empty());
        assert_eq!(tree.parent(child), None);
        /* the slot is still addressable */
        assert_eq!(tree.node(child).tag, "child");
    }

    #[test]
    fn test_detach_root_is_refused() {
        let mut tree = Tree::new("root");
        assert!(!tree.detach(tree.root()));
    }

    #[test]
    fn test_grandchildren_query() {
        let mut tree = Tree::new("root");
        let root = tree.root();

        let a = tree.append_child(root, "a", None).unwrap();
        assert!(!tree.has_grandchildren(root));

        tree.append_child(a, "b", None).unwrap();
        assert!(tree.has_grandchildren(root));
        assert!(!tree.has_grandchildren(a));
    }
}
