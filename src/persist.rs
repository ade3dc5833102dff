use std::fs;
use std::path;
use std::sync;

use crate::bus;
use crate::bus::Event;
use crate::model::document;
use crate::view;

/// Scratch file destination for one document, computed once at open time:
/// `<dir>/<timestamp>-<original basename>`.
pub fn scratch_path(dir: &path::Path, original: &path::Path) -> path::PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d.%H.%M.%S");
    let base = original.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled.xml".to_string());

    dir.join(format!("{}-{}", stamp, base))
}

/// Supplies a destination when the user saves without one (the adapter's
/// file dialog). `None` means the user cancelled.
pub trait SavePathSource: Send + Sync {
    fn choose_path(&self) -> Option<path::PathBuf>;
}

struct Interior {
    document: sync::Arc<document::DocumentHost>,
    path_source: Box<dyn SavePathSource>,
    prompt: view::SharedPrompt,
    autosave: bool,
}

/// Listens for document-changed events and autosaves to the scratch path on
/// each one. Autosave trouble is logged and swallowed; it must never block
/// editing. Explicit saves go through here too, and those do surface their
/// failures.
///
/// Holds no lock of its own: every field is read-only after attach, so the
/// save-path dialog and the error prompt can block (and even re-enter
/// [Coordinator::save]) without wedging anything.
pub struct Coordinator {
    interior: sync::Arc<Interior>,
    _subscription: bus::Subscription,
}

impl Coordinator {
    pub fn attach(
        document: sync::Arc<document::DocumentHost>,
        dispatcher: &sync::Arc<bus::Dispatcher>,
        path_source: Box<dyn SavePathSource>,
        prompt: view::SharedPrompt,
        autosave: bool,
    ) -> Coordinator {
        let interior = sync::Arc::new(Interior {
            document,
            path_source,
            prompt,
            autosave,
        });

        let handler_interior = interior.clone();
        let subscription = dispatcher.subscribe("persistence", move |event| {
            match event {
                Event::DocumentChanged => autosave_flow(&handler_interior),
                Event::SaveRequested { path } => save_flow(&handler_interior, path.clone()),
                _ => {},
            }
            Ok(())
        });

        Coordinator {
            interior,
            _subscription: subscription,
        }
    }

    /// Explicit save, for adapters that wire a menu item directly instead of
    /// publishing a save-requested event.
    pub fn save(&self, path: Option<path::PathBuf>) {
        save_flow(&self.interior, path);
    }

    /// Deletes the scratch file on page close. Deletion failure is logged,
    /// not fatal.
    pub fn close(&self) {
        let document = self.interior.document.read();
        let scratch = document.scratch_path();

        if scratch.exists() {
            if let Err(e) = fs::remove_file(scratch) {
                tracing::warn!("unable to delete scratch file {}: {}", scratch.display(), e);
            }
        }
    }
}

fn autosave_flow(interior: &Interior) {
    if !interior.autosave {
        return;
    }

    let document = interior.document.read();
    if let Err(e) = document.autosave() {
        tracing::warn!("autosave to {} failed: {:?}", document.scratch_path().display(), e);
    }
}

fn save_flow(interior: &Interior, path: Option<path::PathBuf>) {
    let target = match path {
        Some(path) => Some(path),
        None => interior.path_source.choose_path(),
    };

    let Some(target) = target else {
        /* user cancelled the dialog */
        return;
    };

    /* bind before matching so the write guard is gone by the time the error
     * prompt blocks */
    let result = interior.document.write().save(Some(&target));
    match result {
        Ok(saved) => tracing::debug!("saved document to {}", saved.display()),
        Err(e) => {
            tracing::error!("save to {} failed: {:?}", target.display(), e);
            interior.prompt.notify_error(&e.to_string());
        },
    }
}
