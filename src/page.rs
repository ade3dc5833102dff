use std::fmt;
use std::path;
use std::sync;

use crate::bus;
use crate::config;
use crate::model::document;
use crate::persist;
use crate::view;
use crate::view::attribute;
use crate::view::editor;
use crate::view::hierarchy;

/// Everything the GUI adapter supplies for one page: the widget-side
/// surfaces of the three panels, the user-interaction prompt, and the
/// save-destination dialog.
pub struct PageOutlets {
    pub tree: Box<dyn hierarchy::TreeOutlet>,
    pub editor: Box<dyn editor::FormOutlet>,
    pub attributes: Box<dyn attribute::AttributeOutlet>,
    pub prompt: view::SharedPrompt,
    pub save_paths: Box<dyn persist::SavePathSource>,
}

/// One open document and its synchronized views. Construction wires the
/// whole page; a parse failure means no page and no views at all.
pub struct Page {
    id: bus::PageId,
    title: String,
    document: sync::Arc<document::DocumentHost>,
    dispatcher: sync::Arc<bus::Dispatcher>,
    hierarchy: hierarchy::HierarchyView,
    editor: editor::EditorView,
    attributes: attribute::AttributeView,
    coordinator: persist::Coordinator,
}

impl Page {
    /// Opens `path` with the scratch directory from config.
    pub fn open(path: &path::Path, outlets: PageOutlets) -> Result<Page, document::OpenError> {
        let config = config::Config::copy();
        Page::open_in(path, &config.scratch_dir(), config.autosave, outlets)
    }

    pub fn open_in(path: &path::Path, scratch_dir: &path::Path, autosave: bool, outlets: PageOutlets) -> Result<Page, document::OpenError> {
        let document = sync::Arc::new(document::DocumentHost::new(
            document::Document::load(path, scratch_dir)?,
        ));

        let title = path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string());

        let id = bus::PageId::fresh();
        let dispatcher = bus::Dispatcher::new(id);

        let hierarchy = hierarchy::HierarchyView::attach(
            document.clone(), &dispatcher, outlets.tree, outlets.prompt.clone());
        let editor = editor::EditorView::attach(
            document.clone(), &dispatcher, outlets.editor);
        let attributes = attribute::AttributeView::attach(
            document.clone(), &dispatcher, outlets.attributes, outlets.prompt.clone());
        let coordinator = persist::Coordinator::attach(
            document.clone(), &dispatcher, outlets.save_paths, outlets.prompt, autosave);

        /* Initial synthetic focus: every panel renders the root without
         * waiting for a click. Published after all views subscribe so none
         * of them can miss it. */
        let root = document.read().root();
        dispatcher.publish(&bus::Event::FocusChanged { node: Some(root) });

        Ok(Page {
            id,
            title,
            document,
            dispatcher,
            hierarchy,
            editor,
            attributes,
            coordinator,
        })
    }

    pub fn id(&self) -> bus::PageId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn document(&self) -> &sync::Arc<document::DocumentHost> {
        &self.document
    }

    pub fn dispatcher(&self) -> &sync::Arc<bus::Dispatcher> {
        &self.dispatcher
    }

    pub fn hierarchy(&self) -> &hierarchy::HierarchyView {
        &self.hierarchy
    }

    pub fn editor(&self) -> &editor::EditorView {
        &self.editor
    }

    pub fn attributes(&self) -> &attribute::AttributeView {
        &self.attributes
    }

    pub fn is_dirty(&self) -> bool {
        self.document.read().is_dirty()
    }

    /// Explicit save; `None` asks the adapter's save dialog for a path.
    pub fn save(&self, path: Option<path::PathBuf>) {
        self.dispatcher.publish(&bus::Event::SaveRequested { path });
    }

    /// Syntax-highlighted view of the file as last saved. In-memory edits
    /// are deliberately invisible here.
    pub fn raw_view(&self) -> Result<view::raw::RawView, std::io::Error> {
        let path = self.document.read().path().to_path_buf();
        view::raw::RawView::from_file(&path)
    }

    /// Tears the page down: unsubscribes every view and removes the scratch
    /// file.
    pub fn close(self) {
        self.coordinator.close();
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}
