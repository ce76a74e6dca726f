//! Route Table
//!
//! Maps a method and path to a [`Route`]. Rules are checked in order and the
//! first match wins:
//!
//! | # | Method   | Path              | Route          |
//! |---|----------|-------------------|----------------|
//! | 1 | `GET`    | `/`               | `Root`         |
//! | 2 | `GET`    | starts with `/echo` | `Echo`       |
//! | 3 | `GET`    | `/data`           | `ListRecords`  |
//! | 4 | `GET`    | starts with `/data/` | `GetRecord` |
//! | 5 | `POST`   | `/data`           | `CreateRecord` |
//! | 6 | `DELETE` | starts with `/data/` | `DeleteRecord` |
//! | 7 | anything else |              | `NotFound`     |
//!
//! Resolution is pure: it touches neither the store nor the network.

/// A resolved route. ID routes borrow the trailing path segment unparsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Root,
    Echo,
    ListRecords,
    GetRecord(&'a str),
    CreateRecord,
    DeleteRecord(&'a str),
    NotFound,
}

/// Resolves a method and query-free path to a route.
///
/// Methods are matched case-sensitively.
pub fn resolve<'a>(method: &str, path: &'a str) -> Route<'a> {
    match method {
        "GET" if path == "/" => Route::Root,
        "GET" if path.starts_with("/echo") => Route::Echo,
        "GET" if path == "/data" => Route::ListRecords,
        "GET" if path.starts_with("/data/") => Route::GetRecord(last_segment(path)),
        "POST" if path == "/data" => Route::CreateRecord,
        "DELETE" if path.starts_with("/data/") => Route::DeleteRecord(last_segment(path)),
        _ => Route::NotFound,
    }
}

/// The text after the final `/`.
#[inline]
fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}
