use crate::model::tree;
use crate::view::attribute;
use crate::view::hierarchy;

/// What happens when the form's save button is pressed. The add-node and
/// add-attribute dialogs differ only in this; one configurable form with a
/// tagged action replaces a dialog subclass per case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    AddNode { parent: tree::NodeId },
    AddAttribute { node: tree::NodeId },
}

/// A modal two-field entry form. The core only describes it; the GUI
/// adapter draws it, collects the two values, and routes them back through
/// [EntryForm::submit]. An `Err` means the input was rejected and the form
/// should stay open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryForm {
    pub action: SaveAction,
    pub title: String,
    pub label_one: String,
    pub label_two: String,
}

impl EntryForm {
    pub fn add_node(parent: tree::NodeId) -> EntryForm {
        EntryForm {
            action: SaveAction::AddNode { parent },
            title: "New Node".to_string(),
            label_one: "Element Tag".to_string(),
            label_two: "Element Value".to_string(),
        }
    }

    pub fn add_attribute(node: tree::NodeId) -> EntryForm {
        EntryForm {
            action: SaveAction::AddAttribute { node },
            title: "Add Attribute".to_string(),
            label_one: "Attribute".to_string(),
            label_two: "Value".to_string(),
        }
    }

    pub fn submit(
        &self,
        value_one: &str,
        value_two: &str,
        hierarchy: &hierarchy::HierarchyView,
        attributes: &attribute::AttributeView,
    ) -> Result<(), tree::ValidationError> {
        match self.action {
            SaveAction::AddNode { parent } => hierarchy.add_node(parent, value_one, Some(value_two)),
            SaveAction::AddAttribute { node } => attributes.add_attribute(node, value_one, value_two),
        }
    }
}
