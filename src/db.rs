use async_trait::async_trait;
use bson::{doc, Bson, Document};
use mongodb::{options::ClientOptions, Client, Collection};

use crate::codec::EntityCodec;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::gtfs_realtime::FeedMessage;

/// Destination for encoded entities, one document per call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a single document, returning the id the database assigned
    async fn insert_document(&self, document: Document) -> anyhow::Result<Bson>;

    /// `database.collection`, for log lines and errors
    fn namespace(&self) -> String;
}

/// MongoDB collection handle
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect and ping the target database, all within `config.connect_timeout`
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        tracing::info!(namespace = %config.namespace(), "connecting to MongoDB...");

        let timeout = config.connect_timeout;
        let handshake = async {
            let mut options = ClientOptions::parse(&config.mongo_url).await?;
            options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
            options.connect_timeout = Some(timeout);
            options.server_selection_timeout = Some(timeout);

            let client = Client::with_options(options)?;
            client
                .database(&config.database)
                .run_command(doc! { "ping": 1 }, None)
                .await?;
            Ok::<_, mongodb::error::Error>(client)
        };

        let client = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| Error::ConnectTimeout(timeout))?
            .map_err(Error::Connect)?;

        tracing::info!("connected successfully");

        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);
        Ok(Self { collection })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_document(&self, document: Document) -> anyhow::Result<Bson> {
        let result = self.collection.insert_one(document, None).await?;
        Ok(result.inserted_id)
    }

    fn namespace(&self) -> String {
        self.collection.namespace().to_string()
    }
}

/// Ids of the documents written by one [`StoreWriter::write_feed`] call, in feed order
#[derive(Debug, Default)]
pub struct WriteSummary {
    pub inserted_ids: Vec<Bson>,
}

impl WriteSummary {
    pub fn count(&self) -> usize {
        self.inserted_ids.len()
    }
}

/// Inserts every entity of a feed as its own document
pub struct StoreWriter<S, C> {
    store: S,
    codec: C,
}

impl<S: DocumentStore, C: EntityCodec> StoreWriter<S, C> {
    pub fn new(store: S, codec: C) -> Self {
        Self { store, codec }
    }

    /// Insert the feed's entities one at a time, stopping at the first failure.
    ///
    /// Documents inserted before a failure are left in place.
    pub async fn write_feed(&self, feed: &FeedMessage) -> Result<WriteSummary> {
        let namespace = self.store.namespace();
        tracing::info!("insert data into collection <{}>...", namespace);

        let mut summary = WriteSummary::default();
        for (index, entity) in feed.entity.iter().enumerate() {
            let document = self
                .codec
                .encode(entity)
                .map_err(|source| Error::Encode { index, source })?;

            let id = self
                .store
                .insert_document(document)
                .await
                .map_err(|source| Error::Insert {
                    index,
                    namespace: namespace.clone(),
                    source,
                })?;

            tracing::info!(entity = %entity.id, "inserted new item with id={} successfully", id);
            summary.inserted_ids.push(id);
        }

        tracing::debug!(count = summary.count(), "Inserted entities");
        Ok(summary)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BsonCodec;
    use crate::gtfs_realtime::{FeedEntity, FeedHeader};
    use bson::oid::ObjectId;
    use mockall::Sequence;
    use std::time::{Duration, Instant};

    fn feed(ids: &[&str]) -> FeedMessage {
        FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                ..Default::default()
            },
            entity: ids
                .iter()
                .map(|id| FeedEntity {
                    id: id.to_string(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn store() -> MockDocumentStore {
        let mut store = MockDocumentStore::new();
        store
            .expect_namespace()
            .returning(|| "sydneytrains.vehiclepos".to_string());
        store
    }

    #[tokio::test]
    async fn test_one_insert_per_entity() {
        let mut store = store();
        store
            .expect_insert_document()
            .times(3)
            .returning(|_| Ok(Bson::ObjectId(ObjectId::new())));

        let writer = StoreWriter::new(store, BsonCodec::default());
        let summary = writer.write_feed(&feed(&["a", "b", "c"])).await.unwrap();

        assert_eq!(summary.count(), 3);
        assert!(summary.inserted_ids.iter().all(|id| id.as_object_id().is_some()));
    }

    #[tokio::test]
    async fn test_entities_inserted_in_order() {
        let mut store = store();
        let mut seq = Sequence::new();
        for expected in ["first", "second"] {
            store
                .expect_insert_document()
                .withf(move |doc| doc.get_str("id").map_or(false, |id| id == expected))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(Bson::ObjectId(ObjectId::new())));
        }

        let writer = StoreWriter::new(store, BsonCodec::default());
        let summary = writer.write_feed(&feed(&["first", "second"])).await.unwrap();
        assert_eq!(summary.count(), 2);
    }

    #[tokio::test]
    async fn test_empty_feed() {
        let mut store = store();
        store.expect_insert_document().never();

        let writer = StoreWriter::new(store, BsonCodec::default());
        let summary = writer.write_feed(&feed(&[])).await.unwrap();
        assert_eq!(summary.count(), 0);
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let mut store = store();
        let mut seq = Sequence::new();
        store
            .expect_insert_document()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Bson::ObjectId(ObjectId::new())));
        store
            .expect_insert_document()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(anyhow::anyhow!("duplicate key")));

        let writer = StoreWriter::new(store, BsonCodec::default());
        let err = writer
            .write_feed(&feed(&["a", "b", "c"]))
            .await
            .unwrap_err();

        match err {
            Error::Insert {
                index, namespace, ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(namespace, "sydneytrains.vehiclepos");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_insert_error_keeps_driver_message() {
        let mut store = store();
        store.expect_insert_document().times(1).returning(|_| {
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "E11000 duplicate key error collection: sydneytrains.vehiclepos",
            )
            .into())
        });

        let writer = StoreWriter::new(store, BsonCodec::default());
        let err = writer.write_feed(&feed(&["a"])).await.unwrap_err();

        // rendered the way main logs it
        let rendered = format!("{:#}", anyhow::Error::from(err));
        assert!(rendered.starts_with(
            "Insert data into collection <sydneytrains.vehiclepos> failed at entity #0"
        ));
        assert_eq!(rendered.matches("E11000 duplicate key error").count(), 1);
    }

    fn app_config(mongo_url: &str, timeout_secs: u64) -> AppConfig {
        AppConfig {
            api_key: "key".to_string(),
            mongo_url: mongo_url.to_string(),
            feed_url: "http://localhost/feed".to_string(),
            database: "sydneytrains".to_string(),
            collection: "vehiclepos".to_string(),
            connect_timeout: Duration::from_secs(timeout_secs),
            missing_as_null: false,
        }
    }

    #[tokio::test]
    async fn test_connect_malformed_url() {
        let Err(err) = MongoStore::connect(&app_config("not-a-connection-string", 1)).await else {
            panic!("connected with a malformed connection string");
        };
        assert!(matches!(err, Error::Connect(_)));
    }

    #[tokio::test]
    async fn test_connect_is_bounded() {
        let started = Instant::now();
        let Err(err) = MongoStore::connect(&app_config("mongodb://127.0.0.1:1", 1)).await else {
            panic!("connected to a closed port");
        };

        assert!(matches!(err, Error::Connect(_) | Error::ConnectTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
