//! Noteful HTTP API - the route table for folders, tags and notes.
//!
//! Works on plain `http` types: anything that can produce a
//! `Request<String>` can hand it to [`Api::handle`] and send back the
//! `Response<String>` it gets. No server is bundled.

use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderValue, Method, Request, Response, StatusCode, Uri};
use noteful_core::{Database, Error, NoteInput, NoteQuery, NotefulService};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Body of note writes. A `PUT` replaces the whole note: an absent
/// `content`, `folderId` or `tags` is stored as empty, not left unchanged.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteRequest {
    title: Option<String>,
    content: Option<String>,
    folder_id: Option<i64>,
    /// Tag ids
    #[serde(default)]
    tags: Vec<i64>,
}

impl NoteRequest {
    fn into_input(self) -> NoteInput {
        NoteInput {
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            folder_id: self.folder_id,
            tags: self.tags,
        }
    }
}

/// Body of folder and tag writes.
#[derive(Deserialize)]
struct NamedRequest {
    name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Notes,
    Folders,
    Tags,
}

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Root,
    Collection(Resource),
    Item(Resource, &'a str),
}

/// Routes requests to a [`NotefulService`].
pub struct Api<D: Database> {
    service: NotefulService<D>,
    prefix: String,
}

impl<D: Database> Api<D> {
    pub fn new(service: NotefulService<D>) -> Self {
        Self {
            service,
            prefix: String::new(),
        }
    }

    /// Serve routes below `prefix`, e.g. `/api`.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn service(&self) -> &NotefulService<D> {
        &self.service
    }

    /// Handle one request. Never fails: errors become JSON error responses.
    pub async fn handle(&self, req: Request<String>) -> Response<String> {
        let response = match self.dispatch(&req).await {
            Ok(response) => response,
            Err(err) => error_response(&err),
        };
        debug!(
            method = %req.method(),
            path = req.uri().path(),
            status = response.status().as_u16(),
            "handled request"
        );
        response
    }

    async fn dispatch(&self, req: &Request<String>) -> Result<Response<String>, Error> {
        let Some(route) = parse_route(req.uri().path(), &self.prefix) else {
            return Ok(json_error("Not Found", StatusCode::NOT_FOUND));
        };
        let service = &self.service;

        match (req.method().clone(), route) {
            (Method::GET, Route::Root) => Ok(respond(
                "Noteful API".to_string(),
                StatusCode::OK,
                "text/plain; charset=utf-8",
            )),

            // Notes
            (Method::GET, Route::Collection(Resource::Notes)) => {
                let query = note_query(req.uri())?;
                Ok(json_response(&service.list_notes(query).await?, StatusCode::OK))
            }
            (Method::POST, Route::Collection(Resource::Notes)) => {
                let body: NoteRequest = parse_body(req.body())?;
                let note = service.create_note(body.into_input()).await?;
                Ok(created(req, note.id, &note))
            }
            (Method::GET, Route::Item(Resource::Notes, id)) => {
                let note = service.get_note(parse_id(id)?).await?;
                Ok(json_response(&note, StatusCode::OK))
            }
            (Method::PUT, Route::Item(Resource::Notes, id)) => {
                let id = parse_id(id)?;
                let body: NoteRequest = parse_body(req.body())?;
                let note = service.update_note(id, body.into_input()).await?;
                Ok(json_response(&note, StatusCode::OK))
            }
            (Method::DELETE, Route::Item(Resource::Notes, id)) => {
                service.delete_note(parse_id(id)?).await?;
                Ok(no_content())
            }

            // Folders
            (Method::GET, Route::Collection(Resource::Folders)) => {
                Ok(json_response(&service.list_folders().await?, StatusCode::OK))
            }
            (Method::POST, Route::Collection(Resource::Folders)) => {
                let body: NamedRequest = parse_body(req.body())?;
                let folder = service
                    .create_folder(body.name.as_deref().unwrap_or_default())
                    .await?;
                Ok(created(req, folder.id, &folder))
            }
            (Method::GET, Route::Item(Resource::Folders, id)) => {
                let folder = service.get_folder(parse_id(id)?).await?;
                Ok(json_response(&folder, StatusCode::OK))
            }
            (Method::PUT, Route::Item(Resource::Folders, id)) => {
                let id = parse_id(id)?;
                let body: NamedRequest = parse_body(req.body())?;
                let folder = service
                    .update_folder(id, body.name.as_deref().unwrap_or_default())
                    .await?;
                Ok(json_response(&folder, StatusCode::OK))
            }
            (Method::DELETE, Route::Item(Resource::Folders, id)) => {
                service.delete_folder(parse_id(id)?).await?;
                Ok(no_content())
            }

            // Tags
            (Method::GET, Route::Collection(Resource::Tags)) => {
                Ok(json_response(&service.list_tags().await?, StatusCode::OK))
            }
            (Method::POST, Route::Collection(Resource::Tags)) => {
                let body: NamedRequest = parse_body(req.body())?;
                let tag = service
                    .create_tag(body.name.as_deref().unwrap_or_default())
                    .await?;
                Ok(created(req, tag.id, &tag))
            }
            (Method::GET, Route::Item(Resource::Tags, id)) => {
                let tag = service.get_tag(parse_id(id)?).await?;
                Ok(json_response(&tag, StatusCode::OK))
            }
            (Method::PUT, Route::Item(Resource::Tags, id)) => {
                let id = parse_id(id)?;
                let body: NamedRequest = parse_body(req.body())?;
                let tag = service
                    .update_tag(id, body.name.as_deref().unwrap_or_default())
                    .await?;
                Ok(json_response(&tag, StatusCode::OK))
            }
            (Method::DELETE, Route::Item(Resource::Tags, id)) => {
                service.delete_tag(parse_id(id)?).await?;
                Ok(no_content())
            }

            _ => Ok(json_error(
                "Method Not Allowed",
                StatusCode::METHOD_NOT_ALLOWED,
            )),
        }
    }
}

/// Match a request path against the route table, after stripping `prefix`.
fn parse_route<'a>(path: &'a str, prefix: &str) -> Option<Route<'a>> {
    let rest = if prefix.is_empty() {
        path
    } else {
        let rest = path.strip_prefix(prefix)?;
        if !(rest.is_empty() || rest.starts_with('/')) {
            return None;
        }
        rest
    };

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    let resource = |name: &str| match name {
        "notes" => Some(Resource::Notes),
        "folders" => Some(Resource::Folders),
        "tags" => Some(Resource::Tags),
        _ => None,
    };

    match segments.as_slice() {
        [] => Some(Route::Root),
        [name] => resource(*name).map(Route::Collection),
        [name, id] => resource(*name).map(|r| Route::Item(r, *id)),
        _ => None,
    }
}

/// Non-numeric ids can never match a row, so they are reported as not found.
fn parse_id(raw: &str) -> Result<i64, Error> {
    raw.parse()
        .map_err(|_| Error::NotFound(format!("no resource with id {}", raw)))
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Validation(format!("invalid JSON: {}", e)))
}

fn parse_query_id(key: &str, value: &str) -> Result<i64, Error> {
    value
        .parse()
        .map_err(|_| Error::Validation(format!("`{}` must be an integer", key)))
}

/// Read `searchTerm`, `folderId`, `tagId` and `limit`. Empty values are ignored.
///
/// Percent escapes that are not valid UTF-8 decode to U+FFFD.
fn note_query(uri: &Uri) -> Result<NoteQuery, Error> {
    let mut query = NoteQuery::default();
    let pairs = form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes());
    for (key, value) in pairs {
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "searchTerm" => query.search_term = Some(value.into_owned()),
            "folderId" => query.folder_id = Some(parse_query_id(&key, &value)?),
            "tagId" => query.tag_id = Some(parse_query_id(&key, &value)?),
            "limit" => query.limit = Some(parse_query_id(&key, &value)?),
            _ => {}
        }
    }
    Ok(query)
}

fn respond(body: String, status: StatusCode, content_type: &'static str) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn json_response<T: Serialize>(data: &T, status: StatusCode) -> Response<String> {
    match serde_json::to_string(data) {
        Ok(body) => respond(body, status, "application/json"),
        Err(e) => error_response(&Error::Internal(e.to_string())),
    }
}

fn json_error(msg: &str, status: StatusCode) -> Response<String> {
    let body = serde_json::json!({ "error": msg }).to_string();
    respond(body, status, "application/json")
}

fn no_content() -> Response<String> {
    let mut response = Response::new(String::new());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// 201 with a `Location` pointing at the new item below the request path.
fn created<T: Serialize>(req: &Request<String>, id: i64, data: &T) -> Response<String> {
    let mut response = json_response(data, StatusCode::CREATED);
    let location = format!("{}/{}", req.uri().path().trim_end_matches('/'), id);
    match HeaderValue::from_str(&location) {
        Ok(value) => {
            response.headers_mut().insert(LOCATION, value);
        }
        Err(e) => warn!(%location, error = %e, "unusable Location header"),
    }
    response
}

fn error_response(err: &Error) -> Response<String> {
    let (status, msg) = match err {
        Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        Error::Database(msg) | Error::Internal(msg) => {
            (StatusCode::INTERNAL_SERVER_ERROR, msg)
        }
    };
    if status.is_server_error() {
        error!(error = %err, "request failed");
    }
    json_error(msg, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route() {
        assert_eq!(parse_route("/", ""), Some(Route::Root));
        assert_eq!(
            parse_route("/notes/", ""),
            Some(Route::Collection(Resource::Notes))
        );
        assert_eq!(
            parse_route("/tags/12", ""),
            Some(Route::Item(Resource::Tags, "12"))
        );
        assert_eq!(parse_route("/a", ""), None);
        assert_eq!(parse_route("/notes/1/extra", ""), None);
    }

    #[test]
    fn test_parse_route_with_prefix() {
        assert_eq!(
            parse_route("/api/folders", "/api"),
            Some(Route::Collection(Resource::Folders))
        );
        assert_eq!(parse_route("/api", "/api"), Some(Route::Root));
        assert_eq!(parse_route("/apinotes", "/api"), None);
        assert_eq!(parse_route("/notes", "/api"), None);
    }

    #[test]
    fn test_note_query() {
        let uri: Uri = "/notes?searchTerm=about%20cats&folderId=2&tagId=&limit=5&x=1"
            .parse()
            .unwrap();

        let query = note_query(&uri).unwrap();

        assert_eq!(
            query,
            NoteQuery {
                search_term: Some("about cats".into()),
                folder_id: Some(2),
                tag_id: None,
                limit: Some(5),
            }
        );
    }

    #[test]
    fn test_note_query_plus_is_space() {
        let uri: Uri = "/notes?searchTerm=about+cats".parse().unwrap();
        let query = note_query(&uri).unwrap();
        assert_eq!(query.search_term.as_deref(), Some("about cats"));
    }

    #[test]
    fn test_note_query_invalid_utf8_is_replaced() {
        let uri: Uri = "/notes?searchTerm=caf%FF".parse().unwrap();
        let query = note_query(&uri).unwrap();
        assert_eq!(query.search_term.as_deref(), Some("caf\u{FFFD}"));
    }

    #[test]
    fn test_note_query_rejects_bad_integer() {
        let uri: Uri = "/notes?folderId=abc".parse().unwrap();
        assert_eq!(
            note_query(&uri),
            Err(Error::Validation("`folderId` must be an integer".into()))
        );
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::Validation("v".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("n".into()), StatusCode::NOT_FOUND),
            (Error::Database("d".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::Internal("i".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let response = error_response(&err);
            assert_eq!(response.status(), status);
            assert!(response.body().contains("\"error\""));
        }
    }
}
