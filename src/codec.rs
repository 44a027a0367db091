//! Translation of feed entities into BSON documents.
//!
//! The writer only sees [`EntityCodec`]; how protobuf-specific value types
//! end up in the database is decided by the codec it was built with.

use bson::{Bson, DateTime, Document};
use thiserror::Error;

use crate::gtfs_realtime::FeedEntity;

/// GTFS-realtime fields that carry POSIX seconds.
pub const TIMESTAMP_FIELDS: &[&str] = &[
    "timestamp",
    "time",
    "scheduled_time",
    "start",
    "end",
    "last_modified_time",
];

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize entity")]
    Serialize(#[from] bson::ser::Error),

    #[error("field `{field}` holds timestamp {seconds}, outside the range of a BSON date")]
    TimestampOutOfRange { field: String, seconds: i64 },
}

/// Strategy turning one decoded entity into one database document.
pub trait EntityCodec: Send + Sync {
    fn encode(&self, entity: &FeedEntity) -> Result<Document, CodecError>;
}

/// What to write for an optional field the feed left unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingValues {
    #[default]
    Omit,
    Null,
}

/// Default codec.
///
/// Serializes the whole entity, so every field the schema declares is kept
/// under its protobuf name. On top of that:
/// - integer fields named in `timestamp_fields` become BSON dates,
/// - unset optional values are dropped or kept as `null`,
/// - enums stay numeric, unsigned 32-bit integers widen to `Int64`.
#[derive(Debug, Clone)]
pub struct BsonCodec {
    missing: MissingValues,
    timestamp_fields: &'static [&'static str],
}

impl Default for BsonCodec {
    fn default() -> Self {
        Self::new(MissingValues::default())
    }
}

impl BsonCodec {
    pub fn new(missing: MissingValues) -> Self {
        Self {
            missing,
            timestamp_fields: TIMESTAMP_FIELDS,
        }
    }

    pub fn with_timestamp_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.timestamp_fields = fields;
        self
    }

    fn translate_document(&self, doc: Document) -> Result<Document, CodecError> {
        let mut out = Document::new();
        for (key, value) in doc {
            let is_timestamp = self.timestamp_fields.contains(&key.as_str());
            let value = match value {
                Bson::Null if self.missing == MissingValues::Omit => continue,
                Bson::Int64(seconds) if is_timestamp => {
                    Bson::DateTime(posix_seconds(&key, seconds)?)
                }
                Bson::Int32(seconds) if is_timestamp => {
                    Bson::DateTime(posix_seconds(&key, i64::from(seconds))?)
                }
                other => self.translate_value(other)?,
            };
            out.insert(key, value);
        }
        Ok(out)
    }

    fn translate_value(&self, value: Bson) -> Result<Bson, CodecError> {
        Ok(match value {
            Bson::Document(doc) => Bson::Document(self.translate_document(doc)?),
            Bson::Array(items) => Bson::Array(
                items
                    .into_iter()
                    .map(|item| self.translate_value(item))
                    .collect::<Result<_, _>>()?,
            ),
            other => other,
        })
    }
}

impl EntityCodec for BsonCodec {
    fn encode(&self, entity: &FeedEntity) -> Result<Document, CodecError> {
        let doc = bson::to_document(entity)?;
        self.translate_document(doc)
    }
}

/// Lift POSIX seconds to a protobuf timestamp, then to a BSON date.
fn posix_seconds(field: &str, seconds: i64) -> Result<DateTime, CodecError> {
    let timestamp = prost_types::Timestamp { seconds, nanos: 0 };
    timestamp_to_bson(&timestamp).ok_or_else(|| CodecError::TimestampOutOfRange {
        field: field.to_string(),
        seconds,
    })
}

fn timestamp_to_bson(ts: &prost_types::Timestamp) -> Option<DateTime> {
    let millis = ts
        .seconds
        .checked_mul(1000)?
        .checked_add(i64::from(ts.nanos) / 1_000_000)?;
    Some(DateTime::from_millis(millis))
}
