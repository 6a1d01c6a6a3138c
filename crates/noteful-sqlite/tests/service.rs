use noteful_core::{Error, Note, NoteInput, NoteQuery, NotefulService};
use noteful_sqlite::SqliteDatabase;

fn service() -> NotefulService<SqliteDatabase> {
    NotefulService::new(SqliteDatabase::open_in_memory().unwrap())
}

async fn seed_tags(service: &NotefulService<SqliteDatabase>) {
    for name in ["one", "two", "three"] {
        service.create_tag(name).await.unwrap();
    }
}

fn input(title: &str, tags: &[i64]) -> NoteInput {
    NoteInput {
        title: title.to_string(),
        content: "C".to_string(),
        folder_id: None,
        tags: tags.to_vec(),
    }
}

fn tag_ids(note: &Note) -> Vec<i64> {
    note.tags.iter().map(|t| t.id).collect()
}

#[tokio::test]
async fn test_create_returns_hydrated_note() {
    let service = service();
    seed_tags(&service).await;

    let note = service.create_note(input("T", &[2, 1])).await.unwrap();

    assert_eq!(note.title, "T");
    assert_eq!(note.content, "C");
    assert_eq!(tag_ids(&note), vec![1, 2]);
    assert_eq!(note.tags[0].name, "one");
    assert_eq!(service.get_note(note.id).await.unwrap(), note);
}

#[tokio::test]
async fn test_create_ignores_duplicate_tag_ids() {
    let service = service();
    seed_tags(&service).await;

    let note = service.create_note(input("T", &[3, 3, 3])).await.unwrap();

    assert_eq!(tag_ids(&note), vec![3]);
}

#[tokio::test]
async fn test_update_replaces_tags() {
    let service = service();
    seed_tags(&service).await;
    let note = service.create_note(input("T", &[1, 2])).await.unwrap();

    let updated = service
        .update_note(note.id, input("T2", &[3]))
        .await
        .unwrap();

    assert_eq!(updated.id, note.id);
    assert_eq!(updated.title, "T2");
    assert_eq!(tag_ids(&updated), vec![3]);
}

#[tokio::test]
async fn test_update_missing_note_is_not_found() {
    let service = service();

    let err = service
        .update_note(9_999_999, input("T", &[]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_empty_title_is_rejected() {
    let service = service();

    let err = service.create_note(input("   ", &[])).await.unwrap_err();

    assert_eq!(
        err,
        Error::Validation("missing `title` in request body".into())
    );
    assert!(service
        .list_notes(NoteQuery::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unknown_tag_rolls_back_update() {
    let service = service();
    seed_tags(&service).await;
    let note = service.create_note(input("Before", &[1])).await.unwrap();

    let err = service
        .update_note(note.id, input("After", &[2, 404]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Database(_)));
    let unchanged = service.get_note(note.id).await.unwrap();
    assert_eq!(unchanged.title, "Before");
    assert_eq!(tag_ids(&unchanged), vec![1]);
}

#[tokio::test]
async fn test_folder_name_is_joined() {
    let service = service();
    let folder = service.create_folder("Drafts").await.unwrap();

    let note = service
        .create_note(NoteInput {
            folder_id: Some(folder.id),
            ..input("Filed", &[])
        })
        .await
        .unwrap();

    assert_eq!(note.folder_id, Some(folder.id));
    assert_eq!(note.folder_name.as_deref(), Some("Drafts"));
}

#[tokio::test]
async fn test_list_default_limit_and_filters() {
    let service = service();
    seed_tags(&service).await;
    for i in 0..105 {
        let tags: &[i64] = if i % 2 == 0 { &[1, 2] } else { &[] };
        service
            .create_note(input(&format!("Note {}", i), tags))
            .await
            .unwrap();
    }

    let notes = service.list_notes(NoteQuery::default()).await.unwrap();
    assert_eq!(notes.len(), 100);
    assert!(notes.windows(2).all(|w| w[0].id < w[1].id));

    let all = service
        .list_notes(NoteQuery {
            limit: Some(0),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 105);

    let tagged = service
        .list_notes(NoteQuery {
            tag_id: Some(2),
            limit: Some(0),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(tagged.len(), 53);
    assert!(tagged.iter().all(|n| tag_ids(n) == vec![1, 2]));

    let searched = service
        .list_notes(NoteQuery {
            search_term: Some("note 10".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let titles: Vec<&str> = searched.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Note 10", "Note 100", "Note 101", "Note 102", "Note 103", "Note 104"]
    );
}

#[tokio::test]
async fn test_empty_search_term_matches_everything() {
    let service = service();
    service.create_note(input("Alpha", &[])).await.unwrap();

    let notes = service
        .list_notes(NoteQuery {
            search_term: Some(String::new()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(notes.len(), 1);
}

#[tokio::test]
async fn test_negative_limit_is_rejected() {
    let service = service();
    for i in 0..3 {
        service
            .create_note(input(&format!("Note {}", i), &[]))
            .await
            .unwrap();
    }

    let err = service
        .list_notes(NoteQuery {
            limit: Some(-1),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err, Error::Validation("`limit` must not be negative".into()));
}

#[tokio::test]
async fn test_delete_note() {
    let service = service();
    let note = service.create_note(input("Gone", &[])).await.unwrap();

    service.delete_note(note.id).await.unwrap();

    assert!(matches!(
        service.get_note(note.id).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        service.delete_note(note.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_folder_and_tag_crud() {
    let service = service();

    let folder = service.create_folder(" Work ").await.unwrap();
    assert_eq!(folder.name, "Work");
    let renamed = service.update_folder(folder.id, "Office").await.unwrap();
    assert_eq!(service.get_folder(folder.id).await.unwrap(), renamed);
    assert!(matches!(
        service.create_folder("").await,
        Err(Error::Validation(_))
    ));
    service.delete_folder(folder.id).await.unwrap();
    assert!(service.list_folders().await.unwrap().is_empty());

    let tag = service.create_tag("urgent").await.unwrap();
    assert!(matches!(
        service.update_tag(tag.id, " ").await,
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        service.update_tag(tag.id + 1, "x").await,
        Err(Error::NotFound(_))
    ));
    assert_eq!(service.list_tags().await.unwrap(), vec![tag.clone()]);
    service.delete_tag(tag.id).await.unwrap();
    assert!(matches!(
        service.get_tag(tag.id).await,
        Err(Error::NotFound(_))
    ));
}
