//! The note write sequence.

use std::collections::BTreeSet;

use tracing::debug;

use crate::{hydrate, Error, Note, NoteFields, NoteFilter, NoteTransaction};

/// Create (`id` is `None`) or overwrite a note and replace its tag links.
///
/// Steps, each depending on the previous one succeeding:
///
/// 1. insert or update the note row,
/// 2. delete the note's existing tag links,
/// 3. link every id in `tag_ids`,
/// 4. re-read the joined rows for the note,
/// 5. hydrate them into a single note.
///
/// Returns `Ok(None)` when `id` names no existing note; nothing after step 1
/// runs in that case. Storage errors abort the sequence and are returned
/// unchanged. Callers validate `fields` beforehand.
pub fn save_note(
    tx: &dyn NoteTransaction,
    id: Option<i64>,
    fields: &NoteFields,
    tag_ids: &BTreeSet<i64>,
) -> Result<Option<Note>, Error> {
    let id = match id {
        None => tx.insert_note(fields)?,
        Some(id) => {
            if !tx.update_note(id, fields)? {
                return Ok(None);
            }
            id
        }
    };

    let removed = tx.unlink_tags(id)?;
    for tag_id in tag_ids {
        tx.link_tag(id, *tag_id)?;
    }
    debug!(note_id = id, removed, linked = tag_ids.len(), "replaced tag links");

    let mut notes = hydrate(tx.note_rows(&NoteFilter::Id(id))?);
    debug_assert!(notes.len() <= 1, "re-read returned several notes");
    Ok(notes.pop())
}
