use std::fmt;
use std::fs;
use std::path;

use crate::model::tree;
use crate::persist;
use crate::serialization;

#[derive(Debug)]
pub enum OpenError {
    IoError(std::io::Error),
    XmlError(serialization::ParseError),
    /// The scratch directory couldn't be created. Fatal to opening this
    /// document; autosave would have nowhere to go.
    ScratchDir(std::io::Error),
}

impl From<std::io::Error> for OpenError {
    fn from(e: std::io::Error) -> OpenError {
        OpenError::IoError(e)
    }
}

impl From<serialization::ParseError> for OpenError {
    fn from(e: serialization::ParseError) -> OpenError {
        OpenError::XmlError(e)
    }
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::IoError(e) => write!(f, "unable to read file: {}", e),
            OpenError::XmlError(e) => write!(f, "not well-formed XML: {}", e),
            OpenError::ScratchDir(e) => write!(f, "unable to create scratch directory: {}", e),
        }
    }
}

impl std::error::Error for OpenError {}

#[derive(Debug)]
pub enum SaveError {
    IoError(std::io::Error),
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> SaveError {
        SaveError::IoError(e)
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::IoError(e) => write!(f, "unable to save file: {}", e),
        }
    }
}

impl std::error::Error for SaveError {}

/// Autosave trouble. Logged and swallowed; never reaches the user.
#[derive(Debug)]
pub enum PersistenceError {
    IoError(std::io::Error),
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> PersistenceError {
        PersistenceError::IoError(e)
    }
}

/// One open file: the element tree plus path/scratch/dirty bookkeeping.
/// Mutations go through the wrappers here so the dirty flag can't be missed;
/// none of them publish events, that's the calling view's job.
#[derive(Debug)]
pub struct Document {
    tree: tree::Tree,
    path: path::PathBuf,
    scratch_path: path::PathBuf,
    dirty: bool,
}

impl Document {
    /// Parses the file at `path`. On any failure no Document exists and the
    /// caller must not build views. The scratch path is computed once, here,
    /// and is stable for the Document's lifetime.
    pub fn load(path: &path::Path, scratch_dir: &path::Path) -> Result<Document, OpenError> {
        let text = fs::read_to_string(path)?;
        let tree = serialization::parse_tree(&text)?;

        if !scratch_dir.exists() {
            fs::create_dir_all(scratch_dir).map_err(OpenError::ScratchDir)?;
        }

        Ok(Document {
            tree,
            scratch_path: persist::scratch_path(scratch_dir, path),
            path: path.to_path_buf(),
            dirty: false,
        })
    }

    pub fn tree(&self) -> &tree::Tree {
        &self.tree
    }

    pub fn root(&self) -> tree::NodeId {
        self.tree.root()
    }

    pub fn path(&self) -> &path::Path {
        &self.path
    }

    pub fn scratch_path(&self) -> &path::Path {
        &self.scratch_path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /* mutation wrappers; each marks the document dirty on success */

    pub fn set_text(&mut self, id: tree::NodeId, text: &str) {
        self.tree.set_text(id, text);
        self.dirty = true;
    }

    pub fn set_attribute(&mut self, id: tree::NodeId, key: &str, value: &str) -> Result<(), tree::ValidationError> {
        self.tree.set_attribute(id, key, value)?;
        self.dirty = true;
        Ok(())
    }

    pub fn rename_attribute(&mut self, id: tree::NodeId, old: &str, new: &str) -> Result<tree::RenameOutcome, tree::ValidationError> {
        let outcome = self.tree.rename_attribute(id, old, new)?;
        if outcome == tree::RenameOutcome::Renamed {
            self.dirty = true;
        }
        Ok(outcome)
    }

    pub fn remove_attribute(&mut self, id: tree::NodeId, key: &str) -> Option<String> {
        let removed = self.tree.remove_attribute(id, key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn append_child(&mut self, parent: tree::NodeId, tag: &str, text: Option<&str>) -> Result<tree::NodeId, tree::ValidationError> {
        let id = self.tree.append_child(parent, tag, text)?;
        self.dirty = true;
        Ok(id)
    }

    /// Deep-copies `src` and links the copy under `parent`.
    pub fn paste(&mut self, parent: tree::NodeId, src: tree::NodeId) -> tree::NodeId {
        let copy = self.tree.clone_subtree(src);
        self.tree.append_node(parent, copy);
        self.dirty = true;
        copy
    }

    pub fn remove_node(&mut self, id: tree::NodeId) -> bool {
        let removed = self.tree.detach(id);
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// Serializes to `path` (or the document's own path when `None`),
    /// appending the default `.xml` extension when the target lacks one.
    /// Clears the dirty flag on success only.
    pub fn save(&mut self, path: Option<&path::Path>) -> Result<path::PathBuf, SaveError> {
        let mut target = path.unwrap_or(&self.path).to_path_buf();
        if target.extension().is_none() {
            target.set_extension("xml");
        }

        let bytes = serialization::serialize_tree(&self.tree)?;
        fs::write(&target, bytes)?;

        self.dirty = false;
        Ok(target)
    }

    /// Serializes to the scratch path. Never clears the dirty flag; only an
    /// explicit save does that.
    pub fn autosave(&self) -> Result<(), PersistenceError> {
        let bytes = serialization::serialize_tree(&self.tree)?;
        fs::write(&self.scratch_path, bytes)?;
        Ok(())
    }
}

/// Shared handle to one Document. Views hold a clone of the Arc around this
/// and follow the "mutate first (guard dropped), publish after" discipline so
/// subscribers always observe a fully-consistent tree.
pub struct DocumentHost {
    interior: parking_lot::RwLock<Document>,
}

impl DocumentHost {
    pub fn new(document: Document) -> DocumentHost {
        DocumentHost {
            interior: parking_lot::RwLock::new(document),
        }
    }

    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, Document> {
        self.interior.read()
    }

    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, Document> {
        self.interior.write()
    }
}

impl fmt::Debug for DocumentHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHost")
            .field("path", &self.read().path)
            .finish_non_exhaustive()
    }
}
