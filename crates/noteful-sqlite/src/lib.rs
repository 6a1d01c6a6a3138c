//! SQLite implementation of the Noteful database trait.

use noteful_core::{
    Database, Error, Folder, JoinedRow, NoteFields, NoteFilter, NoteQuery, NoteTransaction, Tag,
    SCHEMA, SCHEMA_VERSION,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const NOTE_ROWS_SQL: &str = "SELECT n.id, n.title, n.content, n.folder_id, f.name, t.id, t.name
     FROM notes n
     LEFT JOIN folders f ON n.folder_id = f.id
     LEFT JOIN notes_tags nt ON n.id = nt.note_id
     LEFT JOIN tags t ON nt.tag_id = t.id";

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

/// SQLite-backed database implementation.
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Open a database at the given path and create the schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database with the schema in place.
    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, Error> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(db_err)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_schema()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn
            .lock()
            .map_err(|_| Error::Internal("sqlite connection lock poisoned".into()))
    }

    /// Create the schema unless the stored version is already current.
    fn create_schema(&self) -> Result<(), Error> {
        let conn = self.lock()?;

        // The meta table statement comes first so the version can be read
        conn.execute(SCHEMA[0], []).map_err(db_err)?;

        let current_version: i64 = conn
            .query_row(
                "SELECT value FROM _noteful_meta WHERE key = 'schema_version'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(db_err)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        if current_version >= SCHEMA_VERSION {
            return Ok(());
        }

        debug!(from = current_version, to = SCHEMA_VERSION, "creating schema");
        for statement in &SCHEMA[1..] {
            conn.execute(statement, [])
                .map_err(|e| Error::Database(format!("schema creation failed: {}", e)))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO _noteful_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )
        .map_err(db_err)?;

        Ok(())
    }
}

/// A [`NoteTransaction`] over an open SQLite transaction.
struct SqliteTransaction<'a> {
    conn: &'a Connection,
}

impl NoteTransaction for SqliteTransaction<'_> {
    fn insert_note(&self, fields: &NoteFields) -> Result<i64, Error> {
        self.conn
            .execute(
                "INSERT INTO notes (title, content, folder_id) VALUES (?1, ?2, ?3)",
                params![fields.title, fields.content, fields.folder_id],
            )
            .map_err(db_err)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_note(&self, id: i64, fields: &NoteFields) -> Result<bool, Error> {
        let rows = self
            .conn
            .execute(
                "UPDATE notes SET title = ?1, content = ?2, folder_id = ?3 WHERE id = ?4",
                params![fields.title, fields.content, fields.folder_id, id],
            )
            .map_err(db_err)?;
        Ok(rows > 0)
    }

    fn unlink_tags(&self, note_id: i64) -> Result<usize, Error> {
        self.conn
            .execute("DELETE FROM notes_tags WHERE note_id = ?1", params![note_id])
            .map_err(db_err)
    }

    fn link_tag(&self, note_id: i64, tag_id: i64) -> Result<(), Error> {
        self.conn
            .execute(
                "INSERT INTO notes_tags (note_id, tag_id) VALUES (?1, ?2)",
                params![note_id, tag_id],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn note_rows(&self, filter: &NoteFilter) -> Result<Vec<JoinedRow>, Error> {
        select_note_rows(self.conn, filter)
    }
}

/// Escape `LIKE` wildcards so a search term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Build the id selection for a listing query.
///
/// Filters and the limit apply to notes, not join rows, so they go into a
/// subquery over `notes` alone.
fn note_ids_subquery(query: &NoteQuery, params_vec: &mut Vec<Value>) -> String {
    let mut sql = String::from("SELECT n2.id FROM notes n2");
    let mut conditions = Vec::new();

    if let Some(ref term) = query.search_term {
        params_vec.push(Value::Text(like_pattern(term)));
        conditions.push(format!("n2.title LIKE ?{} ESCAPE '\\'", params_vec.len()));
    }

    if let Some(folder_id) = query.folder_id {
        params_vec.push(Value::Integer(folder_id));
        conditions.push(format!("n2.folder_id = ?{}", params_vec.len()));
    }

    if let Some(tag_id) = query.tag_id {
        params_vec.push(Value::Integer(tag_id));
        conditions.push(format!(
            "n2.id IN (SELECT note_id FROM notes_tags WHERE tag_id = ?{})",
            params_vec.len()
        ));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    sql.push_str(" ORDER BY n2.id");

    if let Some(limit) = query.limit {
        params_vec.push(Value::Integer(limit));
        sql.push_str(&format!(" LIMIT ?{}", params_vec.len()));
    }

    sql
}

fn select_note_rows(conn: &Connection, filter: &NoteFilter) -> Result<Vec<JoinedRow>, Error> {
    let mut params_vec: Vec<Value> = Vec::new();

    let condition = match filter {
        NoteFilter::Id(id) => {
            params_vec.push(Value::Integer(*id));
            "n.id = ?1".to_string()
        }
        NoteFilter::Query(query) => {
            format!("n.id IN ({})", note_ids_subquery(query, &mut params_vec))
        }
    };
    let sql = format!("{} WHERE {} ORDER BY n.id, t.id", NOTE_ROWS_SQL, condition);
    debug!(%sql, "selecting note rows");

    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    let rows = stmt
        .query_map(params_from_iter(params_vec), |row| {
            Ok(JoinedRow {
                note_id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                folder_id: row.get(3)?,
                folder_name: row.get(4)?,
                tag_id: row.get(5)?,
                tag_name: row.get(6)?,
            })
        })
        .map_err(db_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(rows)
}

/// Folders and tags share the `(id, name)` shape; these helpers serve both.
/// `table` is always one of our own table names, never user input.
fn list_named<T>(
    conn: &Connection,
    table: &str,
    make: fn(i64, String) -> T,
) -> Result<Vec<T>, Error> {
    let mut stmt = conn
        .prepare(&format!("SELECT id, name FROM {} ORDER BY id", table))
        .map_err(db_err)?;
    let items = stmt
        .query_map([], |row| Ok(make(row.get(0)?, row.get(1)?)))
        .map_err(db_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)?;
    Ok(items)
}

fn get_named<T>(
    conn: &Connection,
    table: &str,
    id: i64,
    make: fn(i64, String) -> T,
) -> Result<Option<T>, Error> {
    conn.query_row(
        &format!("SELECT id, name FROM {} WHERE id = ?1", table),
        params![id],
        |row| Ok(make(row.get(0)?, row.get(1)?)),
    )
    .optional()
    .map_err(db_err)
}

fn insert_named<T>(
    conn: &Connection,
    table: &str,
    name: &str,
    make: fn(i64, String) -> T,
) -> Result<T, Error> {
    conn.query_row(
        &format!("INSERT INTO {} (name) VALUES (?1) RETURNING id, name", table),
        params![name],
        |row| Ok(make(row.get(0)?, row.get(1)?)),
    )
    .map_err(db_err)
}

fn rename_named<T>(
    conn: &Connection,
    table: &str,
    id: i64,
    name: &str,
    make: fn(i64, String) -> T,
) -> Result<Option<T>, Error> {
    conn.query_row(
        &format!(
            "UPDATE {} SET name = ?1 WHERE id = ?2 RETURNING id, name",
            table
        ),
        params![name, id],
        |row| Ok(make(row.get(0)?, row.get(1)?)),
    )
    .optional()
    .map_err(db_err)
}

fn delete_by_id(conn: &Connection, table: &str, id: i64) -> Result<bool, Error> {
    let rows = conn
        .execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])
        .map_err(db_err)?;
    Ok(rows > 0)
}

fn folder(id: i64, name: String) -> Folder {
    Folder { id, name }
}

fn tag(id: i64, name: String) -> Tag {
    Tag { id, name }
}

#[async_trait::async_trait(?Send)]
impl Database for SqliteDatabase {
    async fn write<T, F>(&self, work: F) -> Result<T, Error>
    where
        F: FnOnce(&dyn NoteTransaction) -> Result<T, Error>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        // Dropping `tx` without committing rolls it back
        let handle: &dyn NoteTransaction = &SqliteTransaction { conn: &tx };
        let value = work(handle)?;
        tx.commit().map_err(db_err)?;
        Ok(value)
    }

    async fn note_rows(&self, filter: &NoteFilter) -> Result<Vec<JoinedRow>, Error> {
        let conn = self.lock()?;
        select_note_rows(&conn, filter)
    }

    async fn delete_note(&self, id: i64) -> Result<bool, Error> {
        let conn = self.lock()?;
        delete_by_id(&conn, "notes", id)
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, Error> {
        let conn = self.lock()?;
        list_named(&conn, "folders", folder)
    }

    async fn get_folder(&self, id: i64) -> Result<Option<Folder>, Error> {
        let conn = self.lock()?;
        get_named(&conn, "folders", id, folder)
    }

    async fn add_folder(&self, name: &str) -> Result<Folder, Error> {
        let conn = self.lock()?;
        insert_named(&conn, "folders", name, folder)
    }

    async fn update_folder(&self, id: i64, name: &str) -> Result<Option<Folder>, Error> {
        let conn = self.lock()?;
        rename_named(&conn, "folders", id, name, folder)
    }

    async fn delete_folder(&self, id: i64) -> Result<bool, Error> {
        let conn = self.lock()?;
        delete_by_id(&conn, "folders", id)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        let conn = self.lock()?;
        list_named(&conn, "tags", tag)
    }

    async fn get_tag(&self, id: i64) -> Result<Option<Tag>, Error> {
        let conn = self.lock()?;
        get_named(&conn, "tags", id, tag)
    }

    async fn add_tag(&self, name: &str) -> Result<Tag, Error> {
        let conn = self.lock()?;
        insert_named(&conn, "tags", name, tag)
    }

    async fn update_tag(&self, id: i64, name: &str) -> Result<Option<Tag>, Error> {
        let conn = self.lock()?;
        rename_named(&conn, "tags", id, name, tag)
    }

    async fn delete_tag(&self, id: i64) -> Result<bool, Error> {
        let conn = self.lock()?;
        delete_by_id(&conn, "tags", id)
    }
}
