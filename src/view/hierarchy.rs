use std::collections::HashSet;
use std::sync;

use crate::bus;
use crate::bus::Event;
use crate::model::document;
use crate::model::tree;
use crate::view;
use crate::view::entry_form;

/// Widget-side surface of the tree view. Rows are keyed by NodeId; the
/// adapter keeps whatever widget handles it needs behind this.
pub trait TreeOutlet: Send {
    fn set_root(&mut self, node: tree::NodeId, label: &str);
    fn append_row(&mut self, parent: tree::NodeId, node: tree::NodeId, label: &str, has_children: bool);
    fn remove_subtree(&mut self, node: tree::NodeId);
    fn mark_has_children(&mut self, node: tree::NodeId);
}

struct Interior {
    document: sync::Arc<document::DocumentHost>,
    dispatcher: sync::Arc<bus::Dispatcher>,
    outlet: Box<dyn TreeOutlet>,
    prompt: view::SharedPrompt,

    /// Nodes whose children have already been materialized as rows. Never
    /// shrinks while the page lives; that's what keeps expansion idempotent.
    expanded: HashSet<tree::NodeId>,
    clipboard: Option<tree::NodeId>,
    selection: Option<tree::NodeId>,
}

/// The tree view synchronizer: presents the node hierarchy, owns the
/// expanded-set and the clipboard slot, and is the sole source of
/// focus-changed and structure-changed events.
pub struct HierarchyView {
    interior: sync::Arc<parking_lot::Mutex<Interior>>,
    _subscription: bus::Subscription,
}

impl HierarchyView {
    /// Renders the root and its first level of children. Does not publish
    /// the initial focus; the page does that once after every view is
    /// attached, so nobody misses the first render.
    pub fn attach(
        document: sync::Arc<document::DocumentHost>,
        dispatcher: &sync::Arc<bus::Dispatcher>,
        mut outlet: Box<dyn TreeOutlet>,
        prompt: view::SharedPrompt,
    ) -> HierarchyView {
        let root = {
            let guard = document.read();
            let root = guard.root();
            outlet.set_root(root, &guard.tree().node(root).tag);
            for child in guard.tree().children(root) {
                outlet.append_row(root, *child, &guard.tree().node(*child).tag, guard.tree().has_children(*child));
            }
            root
        };

        let mut expanded = HashSet::new();
        expanded.insert(root);

        let interior = sync::Arc::new(parking_lot::Mutex::new(Interior {
            document,
            dispatcher: dispatcher.clone(),
            outlet,
            prompt,
            expanded,
            clipboard: None,
            selection: Some(root),
        }));

        let handler_interior = interior.clone();
        let subscription = dispatcher.subscribe("hierarchy", move |event| {
            match event {
                Event::StructureChanged { node } => structure_changed(&handler_interior, *node),
                Event::AddNodeRequested { parent } => {
                    /* The form is modal and its submit re-enters add_node,
                     * so the interior lock must be free while it is up. */
                    let prompt = handler_interior.lock().prompt.clone();
                    prompt.open_entry_form(&entry_form::EntryForm::add_node(*parent));
                },
                Event::RemoveNodeRequested { node } => remove_flow(&handler_interior, *node),
                _ => {},
            }
            Ok(())
        });

        HierarchyView {
            interior,
            _subscription: subscription,
        }
    }

    /// Selection changed in the widget. Publishes focus-changed so the
    /// editor panels re-render; nothing else happens here.
    pub fn select(&self, node: tree::NodeId) {
        let dispatcher = {
            let mut guard = self.interior.lock();
            guard.selection = Some(node);
            guard.dispatcher.clone()
        };

        dispatcher.publish(&Event::FocusChanged { node: Some(node) });
    }

    pub fn selection(&self) -> Option<tree::NodeId> {
        self.interior.lock().selection
    }

    /// Lazily materializes one level of children. Idempotent: a node already
    /// in the expanded-set gets no new rows.
    pub fn expand(&self, node: tree::NodeId) {
        let mut guard = self.interior.lock();
        if guard.expanded.contains(&node) {
            return;
        }

        let interior = &mut *guard;
        {
            let document = interior.document.read();
            for child in document.tree().children(node) {
                interior.outlet.append_row(node, *child, &document.tree().node(*child).tag, document.tree().has_children(*child));
            }
        }

        interior.expanded.insert(node);
    }

    /// Stores the selected node in the clipboard slot, overwriting whatever
    /// was there.
    pub fn copy_selected(&self) {
        let mut guard = self.interior.lock();
        guard.clipboard = guard.selection;
    }

    /// Appends a deep copy of the clipboard node under the selection. Empty
    /// slot or no selection is a no-op.
    pub fn paste(&self) {
        let (dispatcher, pasted) = {
            let guard = self.interior.lock();
            let (Some(src), Some(target)) = (guard.clipboard, guard.selection) else {
                return;
            };

            let pasted = guard.document.write().paste(target, src);
            (guard.dispatcher.clone(), pasted)
        };

        dispatcher.publish(&Event::StructureChanged { node: pasted });
        dispatcher.publish(&Event::DocumentChanged);
    }

    /// Creates and appends a new child, as confirmed from the entry form.
    /// Validation failure surfaces to the user and publishes nothing.
    pub fn add_node(&self, parent: tree::NodeId, tag: &str, text: Option<&str>) -> Result<(), tree::ValidationError> {
        let (dispatcher, added) = {
            let guard = self.interior.lock();
            let added = match guard.document.write().append_child(parent, tag, text) {
                Ok(added) => added,
                Err(e) => {
                    guard.prompt.notify_error(&e.to_string());
                    return Err(e);
                },
            };
            (guard.dispatcher.clone(), added)
        };

        dispatcher.publish(&Event::StructureChanged { node: added });
        dispatcher.publish(&Event::DocumentChanged);
        Ok(())
    }

    /// Removes a node after explicit confirmation. Declining leaves the
    /// model, the rows, and the event stream untouched.
    pub fn remove(&self, node: tree::NodeId) {
        remove_flow(&self.interior, node);
    }

    pub fn remove_selected(&self) {
        let selection = self.interior.lock().selection;
        if let Some(node) = selection {
            remove_flow(&self.interior, node);
        }
    }

    /// Entry form for adding a child under the current selection, for
    /// adapters that wire the context menu directly.
    pub fn entry_form(&self) -> Option<entry_form::EntryForm> {
        self.interior.lock().selection.map(entry_form::EntryForm::add_node)
    }
}

fn structure_changed(interior: &sync::Arc<parking_lot::Mutex<Interior>>, node: tree::NodeId) {
    let mut guard = interior.lock();
    let Some(selection) = guard.selection else {
        return;
    };

    let interior = &mut *guard;
    let document = interior.document.read();

    if interior.expanded.contains(&selection) {
        interior.outlet.append_row(selection, node, &document.tree().node(node).tag, document.tree().has_children(node));
    }

    /* Whether or not a row appeared, the selection just gained a child. */
    if document.tree().has_children(selection) {
        interior.outlet.mark_has_children(selection);
    }
}

fn remove_flow(interior: &sync::Arc<parking_lot::Mutex<Interior>>, node: tree::NodeId) {
    /* The confirm dialog blocks, and the user may poke at the view while it
     * is up; ask with no lock held. */
    let (message, prompt) = {
        let guard = interior.lock();
        let document = guard.document.read();
        let message = format!("Are you sure you want to delete the {} node?", document.tree().node(node).tag);
        (message, guard.prompt.clone())
    };

    if !prompt.confirm(&message) {
        return;
    }

    let dispatcher = {
        let mut guard = interior.lock();

        if !guard.document.write().remove_node(node) {
            /* the root; nothing was removed, so nothing gets published */
            return;
        }

        guard.outlet.remove_subtree(node);
        if guard.selection == Some(node) {
            guard.selection = None;
        }

        guard.dispatcher.clone()
    };

    dispatcher.publish(&Event::DocumentChanged);
}
