use serde::{Deserialize, Serialize};

/// Number of notes returned by a listing when no limit is given.
pub const DEFAULT_NOTE_LIMIT: i64 = 100;

/// A folder that notes can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A note with its folder name and tags resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub folder_id: Option<i64>,
    pub folder_name: Option<String>,
    pub tags: Vec<Tag>,
}

/// One row of `notes ⟕ folders ⟕ notes_tags ⟕ tags`.
///
/// A note with no tags produces a single row with `tag_id` and `tag_name`
/// unset; a note with N tags produces N rows repeating the note columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    pub note_id: i64,
    pub title: String,
    pub content: String,
    pub folder_id: Option<i64>,
    pub folder_name: Option<String>,
    pub tag_id: Option<i64>,
    pub tag_name: Option<String>,
}

/// Columns of the `notes` table itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFields {
    pub title: String,
    pub content: String,
    pub folder_id: Option<i64>,
}

/// Parameters for creating a note or replacing an existing one.
#[derive(Debug, Clone, Default)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
    pub folder_id: Option<i64>,
    /// Tag ids to link. Duplicates are ignored.
    pub tags: Vec<i64>,
}

/// Query parameters for listing notes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NoteQuery {
    /// Case-insensitive substring of the title.
    pub search_term: Option<String>,
    pub folder_id: Option<i64>,
    /// Only notes carrying this tag. Matching notes still report all their tags.
    pub tag_id: Option<i64>,
    pub limit: Option<i64>,
}

/// Which notes a backend should return joined rows for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteFilter {
    Id(i64),
    Query(NoteQuery),
}
