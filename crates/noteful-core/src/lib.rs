//! Noteful core library - shared types, traits, and business logic.
//!
//! This crate contains no I/O. Storage backends implement [`Database`];
//! everything else (hydration, the note write sequence, validation) lives here.

mod db;
mod error;
mod hydrate;
mod note;
mod schema;
mod service;
mod write;

pub use db::{Database, NoteTransaction};
pub use error::Error;
pub use hydrate::hydrate;
pub use note::{
    Folder, JoinedRow, Note, NoteFields, NoteFilter, NoteInput, NoteQuery, Tag,
    DEFAULT_NOTE_LIMIT,
};
pub use schema::{SCHEMA, SCHEMA_VERSION};
pub use service::NotefulService;
pub use write::save_note;
