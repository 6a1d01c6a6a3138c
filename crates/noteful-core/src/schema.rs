//! Schema statements for Noteful storage.
//!
//! Backends run these on open when the stored schema version is older than
//! [`SCHEMA_VERSION`]. The version is tracked in the `_noteful_meta` table.

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 1;

/// Statements creating the full schema. Each one is idempotent.
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS _noteful_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS folders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        created TEXT NOT NULL DEFAULT (datetime('now')),
        folder_id INTEGER REFERENCES folders(id) ON DELETE SET NULL
    )",
    "CREATE TABLE IF NOT EXISTS notes_tags (
        note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
        tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (note_id, tag_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_notes_folder_id ON notes(folder_id)",
    "CREATE INDEX IF NOT EXISTS idx_notes_tags_tag_id ON notes_tags(tag_id)",
];
