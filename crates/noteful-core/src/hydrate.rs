//! Reshaping of flat join rows into nested notes.

use std::collections::{BTreeMap, HashMap};

use crate::{JoinedRow, Note, Tag};

/// A note whose tag set is still being collected.
struct PartialNote {
    id: i64,
    title: String,
    content: String,
    folder_id: Option<i64>,
    folder_name: Option<String>,
    tags: BTreeMap<i64, String>,
}

impl PartialNote {
    fn finish(self) -> Note {
        Note {
            id: self.id,
            title: self.title,
            content: self.content,
            folder_id: self.folder_id,
            folder_name: self.folder_name,
            tags: self
                .tags
                .into_iter()
                .map(|(id, name)| Tag { id, name })
                .collect(),
        }
    }
}

/// Collapse joined rows into one [`Note`] per distinct note id.
///
/// Notes come out in the order their id was first seen. The note columns are
/// taken from that first row. Each note's tags hold every distinct tag id
/// found across its rows, in ascending id order; rows without a tag only
/// establish the note.
pub fn hydrate<I>(rows: I) -> Vec<Note>
where
    I: IntoIterator<Item = JoinedRow>,
{
    let mut notes: Vec<PartialNote> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let JoinedRow {
            note_id,
            title,
            content,
            folder_id,
            folder_name,
            tag_id,
            tag_name,
        } = row;

        let slot = match index.get(&note_id) {
            Some(&slot) => slot,
            None => {
                index.insert(note_id, notes.len());
                notes.push(PartialNote {
                    id: note_id,
                    title,
                    content,
                    folder_id,
                    folder_name,
                    tags: BTreeMap::new(),
                });
                notes.len() - 1
            }
        };

        if let Some(tag_id) = tag_id {
            notes[slot]
                .tags
                .entry(tag_id)
                .or_insert_with(|| tag_name.unwrap_or_default());
        }
    }

    notes.into_iter().map(PartialNote::finish).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(note_id: i64, tag: Option<(i64, &str)>) -> JoinedRow {
        JoinedRow {
            note_id,
            title: format!("Note {}", note_id),
            content: format!("Content {}", note_id),
            folder_id: None,
            folder_name: None,
            tag_id: tag.map(|(id, _)| id),
            tag_name: tag.map(|(_, name)| name.to_string()),
        }
    }

    fn tag_ids(note: &Note) -> Vec<i64> {
        note.tags.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(hydrate(Vec::new()).is_empty());
    }

    #[test]
    fn test_groups_rows_by_note() {
        let rows = vec![
            row(1, Some((10, "cats"))),
            row(1, Some((11, "dogs"))),
            row(2, None),
            row(3, Some((10, "cats"))),
        ];

        let notes = hydrate(rows);

        assert_eq!(notes.len(), 3);
        assert_eq!(tag_ids(&notes[0]), vec![10, 11]);
        assert!(notes[1].tags.is_empty());
        assert_eq!(notes[2].tags, vec![Tag { id: 10, name: "cats".into() }]);
    }

    #[test]
    fn test_keeps_first_seen_order() {
        let rows = vec![
            row(7, None),
            row(3, Some((1, "a"))),
            row(7, Some((2, "b"))),
            row(5, None),
            row(3, Some((2, "b"))),
        ];

        let ids: Vec<i64> = hydrate(rows).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn test_no_tag_row_adds_no_tag() {
        let notes = hydrate(vec![row(1, None), row(1, Some((4, "work")))]);

        assert_eq!(notes.len(), 1);
        assert_eq!(tag_ids(&notes[0]), vec![4]);
    }

    #[test]
    fn test_duplicate_tag_rows_collapse() {
        let notes = hydrate(vec![
            row(1, Some((4, "work"))),
            row(1, Some((4, "work"))),
            row(1, Some((2, "home"))),
        ]);

        assert_eq!(tag_ids(&notes[0]), vec![2, 4]);
    }

    #[test]
    fn test_folder_fields_carried_over() {
        let mut first = row(1, Some((1, "a")));
        first.folder_id = Some(9);
        first.folder_name = Some("Archive".to_string());
        let mut second = first.clone();
        second.tag_id = Some(2);
        second.tag_name = Some("b".to_string());

        let notes = hydrate(vec![first, second]);

        assert_eq!(notes[0].folder_id, Some(9));
        assert_eq!(notes[0].folder_name.as_deref(), Some("Archive"));
        assert_eq!(notes[0].title, "Note 1");
    }

    #[test]
    fn test_repeatable() {
        let rows = vec![
            row(2, Some((1, "a"))),
            row(1, None),
            row(2, Some((3, "c"))),
        ];

        assert_eq!(hydrate(rows.clone()), hydrate(rows));
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut r = row(1, Some((2, "b")));
        r.folder_id = Some(3);
        r.folder_name = Some("Work".to_string());

        let json = serde_json::to_value(&hydrate(vec![r])[0]).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "title": "Note 1",
                "content": "Content 1",
                "folderId": 3,
                "folderName": "Work",
                "tags": [{ "id": 2, "name": "b" }],
            })
        );
    }
}
