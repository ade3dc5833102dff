use std::sync;

pub mod attribute;
pub mod editor;
pub mod entry_form;
pub mod hierarchy;
pub mod raw;

/// What the synchronizers need from the windowing layer to talk to the user
/// directly: yes/no confirmation for destructive actions, synchronous
/// display of validation/save errors, and modal entry forms.
///
/// All three calls block until the user answers, and the user may act on the
/// document while a form is up. Implementations are handed around unlocked,
/// so a synchronizer never holds its own state lock across any of them.
pub trait Prompt {
    fn confirm(&self, message: &str) -> bool;
    fn notify_error(&self, message: &str);

    /// Show a modal entry form. The adapter collects the two values and
    /// routes them back through [entry_form::EntryForm::submit].
    fn open_entry_form(&self, form: &entry_form::EntryForm);
}

pub type SharedPrompt = sync::Arc<dyn Prompt + Send + Sync>;
