use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::{
    hydrate, save_note, Database, Error, Folder, Note, NoteFields, NoteFilter, NoteInput,
    NoteQuery, Tag, DEFAULT_NOTE_LIMIT,
};

/// The main service that contains all business logic.
/// Generic over the database implementation.
pub struct NotefulService<D: Database> {
    db: D,
}

impl<D: Database> NotefulService<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    /// List notes matching the query, ordered by id.
    pub async fn list_notes(&self, query: NoteQuery) -> Result<Vec<Note>, Error> {
        // Apply default limit if not specified (0 means no limit)
        let query = NoteQuery {
            search_term: query.search_term.filter(|s| !s.is_empty()),
            limit: match query.limit {
                Some(n) if n < 0 => {
                    return Err(Error::Validation("`limit` must not be negative".into()));
                }
                Some(0) => None,
                Some(n) => Some(n),
                None => Some(DEFAULT_NOTE_LIMIT),
            },
            ..query
        };
        debug!(?query, "listing notes");
        let rows = self.db.note_rows(&NoteFilter::Query(query)).await?;
        Ok(hydrate(rows))
    }

    pub async fn get_note(&self, id: i64) -> Result<Note, Error> {
        let rows = self.db.note_rows(&NoteFilter::Id(id)).await?;
        hydrate(rows)
            .pop()
            .ok_or_else(|| Error::not_found("note", id))
    }

    /// Create a note and link its tags.
    pub async fn create_note(&self, input: NoteInput) -> Result<Note, Error> {
        let (fields, tags) = Self::note_parts(input)?;
        let note = self
            .db
            .write(move |tx| save_note(tx, None, &fields, &tags))
            .await?
            .ok_or_else(|| Error::NotFound("note vanished after insert".into()))?;
        info!(note_id = note.id, tags = note.tags.len(), "created note");
        Ok(note)
    }

    /// Replace a note's fields and tags.
    pub async fn update_note(&self, id: i64, input: NoteInput) -> Result<Note, Error> {
        let (fields, tags) = Self::note_parts(input)?;
        match self
            .db
            .write(move |tx| save_note(tx, Some(id), &fields, &tags))
            .await?
        {
            Some(note) => {
                info!(note_id = id, tags = note.tags.len(), "updated note");
                Ok(note)
            }
            None => {
                warn!(note_id = id, "update of unknown note");
                Err(Error::not_found("note", id))
            }
        }
    }

    pub async fn delete_note(&self, id: i64) -> Result<(), Error> {
        if !self.db.delete_note(id).await? {
            return Err(Error::not_found("note", id));
        }
        info!(note_id = id, "deleted note");
        Ok(())
    }

    pub async fn list_folders(&self) -> Result<Vec<Folder>, Error> {
        self.db.list_folders().await
    }

    pub async fn get_folder(&self, id: i64) -> Result<Folder, Error> {
        self.db
            .get_folder(id)
            .await?
            .ok_or_else(|| Error::not_found("folder", id))
    }

    pub async fn create_folder(&self, name: &str) -> Result<Folder, Error> {
        let name = Self::required("name", name)?;
        let folder = self.db.add_folder(&name).await?;
        info!(folder_id = folder.id, "created folder");
        Ok(folder)
    }

    pub async fn update_folder(&self, id: i64, name: &str) -> Result<Folder, Error> {
        let name = Self::required("name", name)?;
        self.db
            .update_folder(id, &name)
            .await?
            .ok_or_else(|| Error::not_found("folder", id))
    }

    /// Delete a folder. Notes filed under it lose their folder.
    pub async fn delete_folder(&self, id: i64) -> Result<(), Error> {
        if !self.db.delete_folder(id).await? {
            return Err(Error::not_found("folder", id));
        }
        info!(folder_id = id, "deleted folder");
        Ok(())
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        self.db.list_tags().await
    }

    pub async fn get_tag(&self, id: i64) -> Result<Tag, Error> {
        self.db
            .get_tag(id)
            .await?
            .ok_or_else(|| Error::not_found("tag", id))
    }

    pub async fn create_tag(&self, name: &str) -> Result<Tag, Error> {
        let name = Self::required("name", name)?;
        let tag = self.db.add_tag(&name).await?;
        info!(tag_id = tag.id, "created tag");
        Ok(tag)
    }

    pub async fn update_tag(&self, id: i64, name: &str) -> Result<Tag, Error> {
        let name = Self::required("name", name)?;
        self.db
            .update_tag(id, &name)
            .await?
            .ok_or_else(|| Error::not_found("tag", id))
    }

    /// Delete a tag and remove it from every note.
    pub async fn delete_tag(&self, id: i64) -> Result<(), Error> {
        if !self.db.delete_tag(id).await? {
            return Err(Error::not_found("tag", id));
        }
        info!(tag_id = id, "deleted tag");
        Ok(())
    }

    /// Validate note input and split it into row fields and a tag id set.
    fn note_parts(input: NoteInput) -> Result<(NoteFields, BTreeSet<i64>), Error> {
        let title = Self::required("title", &input.title)?;
        let fields = NoteFields {
            title,
            content: input.content,
            folder_id: input.folder_id,
        };
        Ok((fields, input.tags.into_iter().collect()))
    }

    fn required(field: &str, value: &str) -> Result<String, Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::Validation(format!(
                "missing `{}` in request body",
                field
            )));
        }
        Ok(value.to_string())
    }
}
