use crate::config::MongoConfig;
use crate::document;
use crate::status::StatusSnapshot;
use mongodb::options::{ClientOptions, Credential};
use mongodb::{bson, Client};
use std::time::Duration;
use tracing::trace;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: mongodb::error::Error,
    },
    #[error("serverStatus query against {target} failed: {source}")]
    Query {
        target: String,
        #[source]
        source: mongodb::error::Error,
    },
    #[error("malformed server status reply: {0}")]
    Decode(#[from] document::Error),
}

/// Reads may be answered by any reachable member of the deployment; the
/// driver pins the selected server for the duration of each operation.
fn connection_uri(config: &MongoConfig) -> String {
    let endpoints = config
        .hosts
        .iter()
        .map(|host| host.endpoint.as_str())
        .collect::<Vec<_>>()
        .join(",");
    format!("mongodb://{endpoints}/?readPreference=nearest")
}

async fn connect(config: &MongoConfig) -> Result<Client, SourceError> {
    let uri = connection_uri(config);
    let connect_err = |source| SourceError::Connect {
        target: uri.clone(),
        source,
    };

    let mut options = ClientOptions::parse(&uri).await.map_err(connect_err)?;
    options.connect_timeout = Some(CONNECT_TIMEOUT);
    options.server_selection_timeout = Some(CONNECT_TIMEOUT);
    match &config.username {
        Some(username) if !username.is_empty() => {
            let mut credential = Credential::default();
            credential.username = Some(username.clone());
            credential.password = config.password.clone();
            options.credential = Some(credential);
        }
        // an empty username means no authentication at all
        _ => {}
    }

    Client::with_options(options).map_err(connect_err)
}

async fn query(client: &Client, target: &str) -> Result<StatusSnapshot, SourceError> {
    let reply = client
        .database("admin")
        .run_command(bson::doc! { "serverStatus": 1 })
        .await
        .map_err(|source| SourceError::Query {
            target: target.to_string(),
            source,
        })?;
    let status = StatusSnapshot::decode(&bson::Bson::from(reply))?;
    trace!(
        host = status.host,
        version = status.version,
        "decoded server status"
    );
    Ok(status)
}

/// One status fetch: connect, run `serverStatus` on the admin database,
/// decode, and shut the client down before returning. Every failure comes
/// back as a [`SourceError`] for the caller to log and skip the cycle on.
pub async fn fetch(config: &MongoConfig) -> Result<StatusSnapshot, SourceError> {
    let target = connection_uri(config);
    let client = connect(config).await?;
    let status = query(&client, &target).await;
    client.shutdown().await;
    status
}
