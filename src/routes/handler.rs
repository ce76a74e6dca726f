//! Request Handlers
//!
//! This module executes a resolved route against the data store and produces
//! a [`Response`].
//!
//! ## Endpoints
//!
//! - `GET /` - welcome page (HTML)
//! - `GET /echo?message=<text>` - echoes `message` (or `msg`) as plain text
//! - `GET /data` - all records, ascending by ID
//! - `GET /data/<id>` - one record
//! - `POST /data` - stores a JSON body, returns `{"status":"success","id":<id>}`
//! - `DELETE /data/<id>` - removes a record, returns `{"status":"deleted"}`
//!
//! Anything else gets a plain-text `404 Route not found`.
//!
//! ## Errors
//!
//! Expected client mistakes are not Rust errors here. They are
//! [`ClientError`] values rendered as `{"error": <message>}` responses. Only
//! failures the client could not have caused surface as [`HandlerError`],
//! which the connection turns into a 500.

use crate::codec::{CodecError, CodecPool};
use crate::protocol::{Request, Response, StatusCode};
use crate::routes::table::{resolve, Route};
use crate::storage::DataStore;
use serde_json::{json, Value};
use std::num::{IntErrorKind, ParseIntError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Body of `GET /`
pub const WELCOME_PAGE: &str = "<h1>WELCOME TO MY SERVER</h1>";

/// Body of the catch-all 404, sent as plain text unlike the JSON 404s.
pub const ROUTE_NOT_FOUND: &str = "Route not found";

/// Client-caused failures with a fixed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientError {
    EmptyBody,
    InvalidJson,
    InvalidId,
    NotFound,
    MissingMessage,
}

impl ClientError {
    pub fn status(&self) -> StatusCode {
        match self {
            ClientError::NotFound => StatusCode::NotFound,
            _ => StatusCode::BadRequest,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ClientError::EmptyBody => "Empty body",
            ClientError::InvalidJson => "Invalid JSON payload",
            ClientError::InvalidId => "Invalid ID",
            ClientError::NotFound => "Item not found",
            ClientError::MissingMessage => "Missing message parameter",
        }
    }

    pub fn into_response(self) -> Response {
        Response::error(self.status(), self.message())
    }
}

/// Failures the client did not cause.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("codec failure: {0}")]
    Codec(#[from] CodecError),
}

/// Executes requests against the shared store.
///
/// Cheap to clone; every clone shares the same store and codec pool.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    store: Arc<DataStore>,
    codec: CodecPool,
}

impl RequestHandler {
    pub fn new(store: Arc<DataStore>, codec: CodecPool) -> Self {
        Self { store, codec }
    }

    /// Routes a request and runs its handler.
    pub async fn handle(&self, request: Request) -> Result<Response, HandlerError> {
        let Request {
            method, path, query, body, ..
        } = request;

        let response = match resolve(&method, &path) {
            Route::Root => Response::html(StatusCode::Ok, WELCOME_PAGE),
            Route::Echo => self.echo(query.get("message"), query.get("msg")),
            Route::ListRecords => self.list_records(),
            Route::GetRecord(segment) => self.get_record(segment),
            Route::CreateRecord => self.create_record(body).await?,
            Route::DeleteRecord(segment) => self.delete_record(segment),
            Route::NotFound => Response::text(StatusCode::NotFound, ROUTE_NOT_FOUND),
        };

        Ok(response)
    }

    /// `GET /echo`: `message` wins over `msg`; an empty value counts as absent.
    fn echo(&self, message: Option<&String>, msg: Option<&String>) -> Response {
        let text = [message, msg]
            .into_iter()
            .flatten()
            .find(|value| !value.is_empty());

        match text {
            Some(text) => Response::text(StatusCode::Ok, text.as_str()),
            None => ClientError::MissingMessage.into_response(),
        }
    }

    fn list_records(&self) -> Response {
        Response::json(StatusCode::Ok, Value::Array(self.store.list()))
    }

    fn get_record(&self, segment: &str) -> Response {
        let result =
            parse_id(segment).and_then(|id| self.store.get(id).ok_or(ClientError::NotFound));

        match result {
            Ok(record) => Response::json(StatusCode::Ok, record),
            Err(e) => e.into_response(),
        }
    }

    /// `POST /data`: the body is parsed on the codec pool, then stored.
    ///
    /// The store assigns the ID inside its own lock, after the decode has
    /// finished, so no suspension point separates reading the counter from
    /// advancing it.
    async fn create_record(&self, body: String) -> Result<Response, HandlerError> {
        if body.is_empty() {
            return Ok(ClientError::EmptyBody.into_response());
        }

        let record = match self.codec.decode(body).await {
            Ok(record) => record,
            Err(CodecError::Decode(e)) => {
                warn!(error = %e, "Rejected invalid JSON payload");
                return Ok(ClientError::InvalidJson.into_response());
            }
            Err(e) => return Err(e.into()),
        };

        let id = self.store.create(record);
        debug!(id, "Record created");

        Ok(Response::json(
            StatusCode::Created,
            json!({ "status": "success", "id": id }),
        ))
    }

    fn delete_record(&self, segment: &str) -> Response {
        let result =
            parse_id(segment).and_then(|id| self.store.delete(id).ok_or(ClientError::NotFound));

        match result {
            Ok(_) => {
                debug!(segment, "Record deleted");
                Response::json(StatusCode::Ok, json!({ "status": "deleted" }))
            }
            Err(e) => e.into_response(),
        }
    }
}

/// Parses a record ID from a path segment.
///
/// Any integer is a valid ID. Negative values and integers too large for an
/// `i64` simply never match a record.
fn parse_id(segment: &str) -> Result<u64, ClientError> {
    let id: i64 = segment.trim().parse().map_err(|e: ParseIntError| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ClientError::NotFound,
        _ => ClientError::InvalidId,
    })?;
    u64::try_from(id).map_err(|_| ClientError::NotFound)
}
