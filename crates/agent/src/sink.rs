use tokio::net::UdpSocket;
use tracing::trace;

/// Prefix every gauge is published under: `{env}.{cluster}.{host}`, with the
/// cluster segment left out when none is configured. The host segment comes
/// from the snapshot being published, so metrics are attributed to the server
/// that actually answered the status query.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(env: &str, cluster: Option<&str>, host: &str) -> Self {
        let mut prefix = String::from(env);
        match cluster {
            Some(cluster) if !cluster.is_empty() => {
                prefix.push('.');
                prefix.push_str(cluster);
            }
            _ => {}
        }
        prefix.push('.');
        prefix.push_str(host);
        Self(prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to reach statsd at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to send gauge: {0}")]
    Send(#[from] std::io::Error),
}

/// Destination for gauge updates. One sink serves one publish cycle.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn gauge(&self, name: &str, value: i64) -> Result<(), SinkError>;
}

/// statsd client over a connected UDP socket. Dropping the sink releases the
/// socket, so no connection outlives its cycle.
#[derive(Debug)]
pub struct StatsdSink {
    socket: UdpSocket,
    namespace: Namespace,
}

impl StatsdSink {
    pub async fn connect(host: &str, port: u16, namespace: Namespace) -> Result<Self, SinkError> {
        let endpoint = format!("{host}:{port}");
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|source| SinkError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;
        socket
            .connect(&endpoint)
            .await
            .map_err(|source| SinkError::Connect { endpoint, source })?;
        trace!(namespace = %namespace, "statsd sink ready");
        Ok(Self { socket, namespace })
    }
}

#[async_trait::async_trait]
impl Sink for StatsdSink {
    /// Sends one gauge datagram at sample rate 1.0; the wire format omits the
    /// rate suffix when nothing is dropped.
    async fn gauge(&self, name: &str, value: i64) -> Result<(), SinkError> {
        let datagram = format!("{}.{}:{}|g", self.namespace, name, value);
        self.socket.send(datagram.as_bytes()).await?;
        Ok(())
    }
}
