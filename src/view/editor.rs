use std::sync;

use crate::bus;
use crate::bus::Event;
use crate::model::document;
use crate::model::tree;

/// One editable text field, bound to the node whose text it edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub node: tree::NodeId,
    pub label: String,
    pub value: String,
}

/// What the value panel shows for the focused node. The variants are
/// mutually exclusive by construction; exactly one applies per focus event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorLayout {
    /// No focus; nothing to edit.
    Empty,

    /// The focused node has children and none of them have children of
    /// their own: one field per child.
    ChildFields(Vec<Field>),

    /// The focused node is itself a leaf with text: one field for it.
    SingleField(Field),

    /// Nothing editable here; offer only the add-node affordance.
    AddNodeOnly,
}

/// Widget-side surface of the value panel. `render` replaces the previous
/// contents wholesale.
pub trait FormOutlet: Send {
    fn render(&mut self, layout: &EditorLayout);
}

struct Interior {
    document: sync::Arc<document::DocumentHost>,
    dispatcher: sync::Arc<bus::Dispatcher>,
    outlet: Box<dyn FormOutlet>,
    focus: Option<tree::NodeId>,
}

/// The node-value editor synchronizer. Re-renders on focus changes and
/// writes field edits straight into the model.
pub struct EditorView {
    interior: sync::Arc<parking_lot::Mutex<Interior>>,
    _subscription: bus::Subscription,
}

impl EditorView {
    pub fn attach(
        document: sync::Arc<document::DocumentHost>,
        dispatcher: &sync::Arc<bus::Dispatcher>,
        outlet: Box<dyn FormOutlet>,
    ) -> EditorView {
        let interior = sync::Arc::new(parking_lot::Mutex::new(Interior {
            document,
            dispatcher: dispatcher.clone(),
            outlet,
            focus: None,
        }));

        let handler_interior = interior.clone();
        let subscription = dispatcher.subscribe("editor", move |event| {
            if let Event::FocusChanged { node } = event {
                let mut guard = handler_interior.lock();
                guard.focus = *node;

                let interior = &mut *guard;
                let layout = {
                    let document = interior.document.read();
                    layout_for(document.tree(), interior.focus)
                };
                interior.outlet.render(&layout);
            }
            Ok(())
        });

        EditorView {
            interior,
            _subscription: subscription,
        }
    }

    /// A field's text changed. Writes through to the model and publishes
    /// document-changed; deliberately never focus-changed, so editing a
    /// value doesn't make every view re-render.
    pub fn edit_field(&self, node: tree::NodeId, text: &str) {
        let dispatcher = {
            let guard = self.interior.lock();
            guard.document.write().set_text(node, text);
            guard.dispatcher.clone()
        };

        dispatcher.publish(&Event::DocumentChanged);
    }

    /// The add-node affordance was activated. This view owns no
    /// node-creation UI; it asks the tree view to run its flow.
    pub fn request_add_node(&self) {
        let (dispatcher, focus) = {
            let guard = self.interior.lock();
            (guard.dispatcher.clone(), guard.focus)
        };

        if let Some(parent) = focus {
            dispatcher.publish(&Event::AddNodeRequested { parent });
        }
    }
}

fn layout_for(tree: &tree::Tree, focus: Option<tree::NodeId>) -> EditorLayout {
    let Some(node) = focus else {
        return EditorLayout::Empty;
    };

    if tree.has_children(node) {
        if tree.has_grandchildren(node) {
            return EditorLayout::AddNodeOnly;
        }

        return EditorLayout::ChildFields(
            tree.children(node)
                .iter()
                .map(|child| Field {
                    node: *child,
                    label: tree.node(*child).tag.clone(),
                    value: tree.node(*child).text.clone().unwrap_or_default(),
                })
                .collect(),
        );
    }

    match &tree.node(node).text {
        Some(text) => EditorLayout::SingleField(Field {
            node,
            label: tree.node(node).tag.clone(),
            value: text.clone(),
        }),
        None => EditorLayout::AddNodeOnly,
    }
}
