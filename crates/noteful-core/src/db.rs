use crate::{Error, Folder, JoinedRow, NoteFields, NoteFilter, Tag};

/// Note writes available inside a single storage unit of work.
///
/// Every method runs against the same transaction, so the note row and its
/// tag links change together or not at all.
pub trait NoteTransaction {
    /// Insert a note row and return its generated id.
    fn insert_note(&self, fields: &NoteFields) -> Result<i64, Error>;

    /// Overwrite a note row. Returns false if no note has this id.
    fn update_note(&self, id: i64, fields: &NoteFields) -> Result<bool, Error>;

    /// Remove every tag link of a note. Returns the number of links removed.
    fn unlink_tags(&self, note_id: i64) -> Result<usize, Error>;

    fn link_tag(&self, note_id: i64, tag_id: i64) -> Result<(), Error>;

    /// Joined rows for the selected notes, grouped by note id.
    fn note_rows(&self, filter: &NoteFilter) -> Result<Vec<JoinedRow>, Error>;
}

/// Storage abstraction for folders, tags and notes.
///
/// Uses `async_trait` with a `?Send` bound so backends can hold
/// single-threaded handles.
#[async_trait::async_trait(?Send)]
pub trait Database {
    /// Run `work` as one unit of work: committed when it returns `Ok`,
    /// rolled back when it returns `Err`.
    async fn write<T, F>(&self, work: F) -> Result<T, Error>
    where
        F: FnOnce(&dyn NoteTransaction) -> Result<T, Error>;

    /// Joined rows for the selected notes, grouped by note id.
    async fn note_rows(&self, filter: &NoteFilter) -> Result<Vec<JoinedRow>, Error>;

    /// Delete a note and its tag links. Returns false if not found.
    async fn delete_note(&self, id: i64) -> Result<bool, Error>;

    async fn list_folders(&self) -> Result<Vec<Folder>, Error>;

    async fn get_folder(&self, id: i64) -> Result<Option<Folder>, Error>;

    async fn add_folder(&self, name: &str) -> Result<Folder, Error>;

    /// Rename a folder. Returns `None` if not found.
    async fn update_folder(&self, id: i64, name: &str) -> Result<Option<Folder>, Error>;

    /// Delete a folder; its notes are kept without a folder.
    async fn delete_folder(&self, id: i64) -> Result<bool, Error>;

    async fn list_tags(&self) -> Result<Vec<Tag>, Error>;

    async fn get_tag(&self, id: i64) -> Result<Option<Tag>, Error>;

    async fn add_tag(&self, name: &str) -> Result<Tag, Error>;

    async fn update_tag(&self, id: i64, name: &str) -> Result<Option<Tag>, Error>;

    /// Delete a tag and unlink it from every note.
    async fn delete_tag(&self, id: i64) -> Result<bool, Error>;
}
