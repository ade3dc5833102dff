use std::sync;

use crate::bus;
use crate::bus::Event;
use crate::model::document;
use crate::model::tree;
use crate::view;
use crate::view::entry_form;

/// One key/value pair as displayed; rows follow the node's attribute
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRow {
    pub key: String,
    pub value: String,
}

/// Widget-side surface of the attribute panel. `render` replaces the
/// previous contents wholesale.
pub trait AttributeOutlet: Send {
    fn render(&mut self, rows: &[AttributeRow]);
}

struct Interior {
    document: sync::Arc<document::DocumentHost>,
    dispatcher: sync::Arc<bus::Dispatcher>,
    outlet: Box<dyn AttributeOutlet>,
    prompt: view::SharedPrompt,
    focus: Option<tree::NodeId>,
}

/// The attribute editor synchronizer.
pub struct AttributeView {
    interior: sync::Arc<parking_lot::Mutex<Interior>>,
    _subscription: bus::Subscription,
}

impl AttributeView {
    pub fn attach(
        document: sync::Arc<document::DocumentHost>,
        dispatcher: &sync::Arc<bus::Dispatcher>,
        outlet: Box<dyn AttributeOutlet>,
        prompt: view::SharedPrompt,
    ) -> AttributeView {
        let interior = sync::Arc::new(parking_lot::Mutex::new(Interior {
            document,
            dispatcher: dispatcher.clone(),
            outlet,
            prompt,
            focus: None,
        }));

        let handler_interior = interior.clone();
        let subscription = dispatcher.subscribe("attributes", move |event| {
            if let Event::FocusChanged { node } = event {
                let mut guard = handler_interior.lock();
                guard.focus = *node;
                render(&mut guard);
            }
            Ok(())
        });

        AttributeView {
            interior,
            _subscription: subscription,
        }
    }

    /// A key field changed. The value moves from the old key to the new one;
    /// a collision with a different existing key is rejected outright rather
    /// than silently destroying that attribute. Rejections and no-ops
    /// publish nothing.
    pub fn rename_key(&self, old: &str, new: &str) -> Result<(), tree::ValidationError> {
        let (outcome, dispatcher) = {
            let guard = self.interior.lock();
            let Some(node) = guard.focus else {
                return Ok(());
            };

            /* bind before matching so the write guard drops here, not at the
             * end of the block */
            let result = guard.document.write().rename_attribute(node, old, new);
            match result {
                Ok(outcome) => (outcome, guard.dispatcher.clone()),
                Err(e) => {
                    guard.prompt.notify_error(&e.to_string());
                    return Err(e);
                },
            }
        };

        if outcome == tree::RenameOutcome::Renamed {
            dispatcher.publish(&Event::DocumentChanged);
        }

        Ok(())
    }

    /// A value field changed. Always accepted; writes under the field's
    /// current key.
    pub fn edit_value(&self, key: &str, value: &str) -> Result<(), tree::ValidationError> {
        let dispatcher = {
            let guard = self.interior.lock();
            let Some(node) = guard.focus else {
                return Ok(());
            };

            let result = guard.document.write().set_attribute(node, key, value);
            if let Err(e) = result {
                guard.prompt.notify_error(&e.to_string());
                return Err(e);
            }

            guard.dispatcher.clone()
        };

        dispatcher.publish(&Event::DocumentChanged);
        Ok(())
    }

    /// Confirmed from the add-attribute entry form. An empty key is a
    /// validation error surfaced to the user, not a fault; the model stays
    /// untouched and nothing is published. On success the panel re-renders
    /// itself.
    pub fn add_attribute(&self, node: tree::NodeId, key: &str, value: &str) -> Result<(), tree::ValidationError> {
        let dispatcher = {
            let mut guard = self.interior.lock();

            let result = guard.document.write().set_attribute(node, key, value);
            if let Err(e) = result {
                guard.prompt.notify_error(&e.to_string());
                return Err(e);
            }

            render(&mut guard);
            guard.dispatcher.clone()
        };

        dispatcher.publish(&Event::DocumentChanged);
        Ok(())
    }

    /// Entry form for adding an attribute to the focused node.
    pub fn entry_form(&self) -> Option<entry_form::EntryForm> {
        self.interior.lock().focus.map(entry_form::EntryForm::add_attribute)
    }
}

fn render(guard: &mut Interior) {
    let rows = {
        let document = guard.document.read();
        match guard.focus {
            Some(node) => document.tree().node(node).attributes
                .iter()
                .map(|(key, value)| AttributeRow {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
            None => Vec::new(),
        }
    };

    guard.outlet.render(&rows);
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use crate::test_support;

    struct RecordingOutlet {
        renders: sync::Arc<parking_lot::Mutex<Vec<Vec<AttributeRow>>>>,
    }

    impl AttributeOutlet for RecordingOutlet {
        fn render(&mut self, rows: &[AttributeRow]) {
            self.renders.lock().push(rows.to_vec());
        }
    }

    struct NotifyingPrompt {
        errors: sync::Arc<parking_lot::Mutex<Vec<String>>>,
    }

    impl view::Prompt for NotifyingPrompt {
        fn confirm(&self, _message: &str) -> bool {
            true
        }

        fn notify_error(&self, message: &str) {
            self.errors.lock().push(message.to_string());
        }

        fn open_entry_form(&self, _form: &entry_form::EntryForm) {}
    }

    struct Fixture {
        document: sync::Arc<document::DocumentHost>,
        dispatcher: sync::Arc<bus::Dispatcher>,
        view: AttributeView,
        renders: sync::Arc<parking_lot::Mutex<Vec<Vec<AttributeRow>>>>,
        errors: sync::Arc<parking_lot::Mutex<Vec<String>>>,
        events: sync::Arc<parking_lot::Mutex<Vec<Event>>>,
        _recorder: bus::Subscription,
    }

    fn fixture(xml: &str) -> Fixture {
        let dir = test_support::scratch_dir("attribute");
        let path = test_support::write_file(&dir, "doc.xml", xml);
        let document = sync::Arc::new(document::DocumentHost::new(
            document::Document::load(&path, &dir).unwrap(),
        ));

        let dispatcher = bus::Dispatcher::new(bus::PageId::fresh());

        let events = sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recorded = events.clone();
        let recorder = dispatcher.subscribe("recorder", move |event| {
            recorded.lock().push(event.clone());
            Ok(())
        });

        let renders = sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let errors = sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let view = AttributeView::attach(
            document.clone(),
            &dispatcher,
            Box::new(RecordingOutlet { renders: renders.clone() }),
            sync::Arc::new(NotifyingPrompt { errors: errors.clone() }),
        );

        Fixture {
            document,
            dispatcher,
            view,
            renders,
            errors,
            events,
            _recorder: recorder,
        }
    }

    fn focus_root(f: &Fixture) -> tree::NodeId {
        let root = f.document.read().root();
        f.dispatcher.publish(&Event::FocusChanged { node: Some(root) });
        f.events.lock().clear();
        root
    }

    fn row(key: &str, value: &str) -> AttributeRow {
        AttributeRow { key: key.to_string(), value: value.to_string() }
    }

    #[test]
    fn test_focus_renders_rows_in_insertion_order() {
        let f = fixture("<book zeta=\"1\" alpha=\"2\"/>");
        focus_root(&f);

        assert_eq!(*f.renders.lock(), vec![vec![row("zeta", "1"), row("alpha", "2")]]);
    }

    #[test]
    fn test_add_attribute_to_bare_node() {
        let f = fixture("<book/>");
        let root = focus_root(&f);

        f.view.add_attribute(root, "lang", "en").unwrap();

        assert_eq!(*f.events.lock(), vec![Event::DocumentChanged]);
        /* panel re-rendered with exactly one pair */
        assert_eq!(f.renders.lock().last().unwrap(), &vec![row("lang", "en")]);
    }

    #[test]
    fn test_add_attribute_with_empty_key_is_surfaced_and_publishes_nothing() {
        let f = fixture("<book/>");
        let root = focus_root(&f);
        let renders_before = f.renders.lock().len();

        assert_matches!(f.view.add_attribute(root, "", "en"), Err(tree::ValidationError::EmptyAttributeKey));

        assert_eq!(f.events.lock().len(), 0);
        assert_eq!(f.errors.lock().len(), 1);
        assert_eq!(f.renders.lock().len(), renders_before);
        assert!(f.document.read().tree().node(root).attributes.is_empty());
    }

    #[test]
    fn test_rename_key_moves_value() {
        let f = fixture("<book lang=\"en\"/>");
        let root = focus_root(&f);

        f.view.rename_key("lang", "language").unwrap();

        assert_eq!(*f.events.lock(), vec![Event::DocumentChanged]);
        let document = f.document.read();
        assert_eq!(document.tree().node(root).attributes.get("language").map(String::as_str), Some("en"));
        assert!(!document.tree().node(root).attributes.contains_key("lang"));
    }

    #[test]
    fn test_rename_collision_is_rejected_with_no_event() {
        let f = fixture("<book lang=\"en\" id=\"7\"/>");
        let root = focus_root(&f);

        assert_matches!(f.view.rename_key("lang", "id"), Err(tree::ValidationError::DuplicateAttributeKey(_)));

        assert_eq!(f.events.lock().len(), 0);
        assert_eq!(f.errors.lock().len(), 1);
        let document = f.document.read();
        assert_eq!(document.tree().node(root).attributes.get("lang").map(String::as_str), Some("en"));
        assert_eq!(document.tree().node(root).attributes.get("id").map(String::as_str), Some("7"));
        assert!(!document.is_dirty());
    }

    #[test]
    fn test_rename_to_same_key_publishes_nothing() {
        let f = fixture("<book lang=\"en\"/>");
        focus_root(&f);

        f.view.rename_key("lang", "lang").unwrap();

        assert_eq!(f.events.lock().len(), 0);
    }

    #[test]
    fn test_edit_value_publishes_once() {
        let f = fixture("<book lang=\"en\"/>");
        let root = focus_root(&f);

        f.view.edit_value("lang", "de").unwrap();

        assert_eq!(*f.events.lock(), vec![Event::DocumentChanged]);
        assert_eq!(f.document.read().tree().node(root).attributes.get("lang").map(String::as_str), Some("de"));
    }

    #[test]
    fn test_entry_form_targets_focused_node() {
        let f = fixture("<book/>");
        let root = focus_root(&f);

        let form = f.view.entry_form().unwrap();
        assert_eq!(form.action, entry_form::SaveAction::AddAttribute { node: root });
    }
}
