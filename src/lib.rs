//! Fetch a GTFS-realtime vehicle-position feed once and store every entity
//! as its own MongoDB document.
//!
//! ```text
//! FeedClient::fetch ──▶ decode_feed ──▶ StoreWriter::write_feed ──▶ MongoStore
//!                                              │
//!                                          EntityCodec
//! ```

pub mod api;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod gtfs_realtime;

pub use api::{decode_feed, FeedClient};
pub use codec::{BsonCodec, EntityCodec, MissingValues};
pub use config::{AppConfig, Settings};
pub use db::{DocumentStore, MongoStore, StoreWriter, WriteSummary};
pub use error::{Error, Result};
