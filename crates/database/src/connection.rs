use crate::error::{DbError, StoreError};
use crate::store::{CollectionProvider, ConnectionCapability, MongoDatabase};
use bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::time::Duration;

/// A verified connection to a MongoDB endpoint.
///
/// Only ever produced by a successful `connect`, so holding one means the
/// server answered a ping. The driver client is internally pooled and safe to
/// share across tasks; wrap the handle in an `Arc` and pass it around.
#[derive(Debug, Clone)]
pub struct MongoConnection {
    client: Client,
    uri: String,
}

impl MongoConnection {
    /// The URI this handle was connected with.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Closes the driver's sessions and background monitors.
    pub async fn shutdown(self) {
        tracing::info!(uri = %self.uri, "Shutting down document store connection.");
        self.client.shutdown().await;
    }
}

impl ConnectionCapability for MongoConnection {
    fn database(&self, name: &str) -> Box<dyn CollectionProvider> {
        Box::new(MongoDatabase::new(self.client.database(name)))
    }
}

/// Establishes a direct connection to the store at `uri` and pings it.
///
/// Fails fast: there is no retry, and no handle is returned unless both the
/// client construction and the liveness check succeed.
pub async fn connect(uri: &str) -> Result<MongoConnection, DbError> {
    connect_with(uri, None).await
}

/// Like [`connect`], but bounds how long the driver waits to find the server.
pub async fn connect_with(
    uri: &str,
    server_selection_timeout: Option<Duration>,
) -> Result<MongoConnection, DbError> {
    if uri.trim().is_empty() {
        return Err(DbError::ConnectionError(StoreError::InvalidUri(
            "connection URI must not be empty".to_string(),
        )));
    }

    let mut options = ClientOptions::parse(uri)
        .await
        .map_err(|e| DbError::ConnectionError(e.into()))?;
    // Talk to exactly this host, never discover the rest of a replica set.
    options.direct_connection = Some(true);
    if server_selection_timeout.is_some() {
        options.server_selection_timeout = server_selection_timeout;
    }

    let client = Client::with_options(options).map_err(|e| DbError::ConnectionError(e.into()))?;

    client
        .database("admin")
        .run_command(doc! { "ping": 1 }, None)
        .await
        .map_err(|e| DbError::ConnectionError(e.into()))?;

    tracing::info!("Connected to document store.");

    Ok(MongoConnection {
        client,
        uri: uri.to_string(),
    })
}
