use std::process::ExitCode;

use vehiclepos::{
    decode_feed, BsonCodec, FeedClient, MissingValues, MongoStore, Settings, StoreWriter,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(count) => {
            tracing::info!(count, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            // alternate form walks the source chain
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<usize> {
    let config = Settings::load()?.validate()?;
    tracing::debug!(?config, "configuration loaded");

    let client = FeedClient::new(&config.feed_url, &config.api_key)?;
    let data = client.fetch().await?;
    let feed = decode_feed(&data)?;

    let missing = if config.missing_as_null {
        MissingValues::Null
    } else {
        MissingValues::Omit
    };
    let store = MongoStore::connect(&config).await?;
    let writer = StoreWriter::new(store, BsonCodec::new(missing));
    let summary = writer.write_feed(&feed).await?;

    Ok(summary.count())
}
