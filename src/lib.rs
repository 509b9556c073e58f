//! Access layer for hosted-table REST backends that cap every list request at
//! 1000 rows.
//!
//! - [`query`] validates selection criteria and encodes `q.`-prefixed query strings.
//! - [`pages`] drives repeated page requests until a result set is exhausted,
//!   either collecting it ([`pages::fetch_all`]) or streaming it
//!   ([`pages::stream_all`]) through a [`sink::JsonArrayWriter`].
//! - [`reconcile`] maps list-field values onto the live index definition, and
//!   [`copy`] uses it to re-create records across tables.
//! - [`http::ApiClient`] is the reqwest-backed implementation of the
//!   [`pages::PageSource`] and [`copy::RecordStore`] seams.

pub mod copy;
pub mod error;
pub mod http;
pub mod pages;
pub mod query;
pub mod reconcile;
pub mod resource;
pub mod session;
pub mod sink;

pub use copy::{copy_record, CopyOutcome, CopyRequest, FieldDefinition, RecordStore};
pub use error::{Error, Result};
pub use http::ApiClient;
pub use pages::{fetch_all, fetch_records, stream_all, PageSource, Pages};
pub use query::{build_query, Criteria, QueryMode, PAGE_CEILING};
pub use reconcile::{reconcile, ListDefinition, ListKind};
pub use resource::Resource;
pub use session::Session;
pub use sink::JsonArrayWriter;

/// One row as returned by the backend: field name to value, in column order.
pub type Record = serde_json::Map<String, serde_json::Value>;
