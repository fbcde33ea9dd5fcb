//! RepublishSink - forwards prediction envelopes to an output stream
//!
//! The stream backend sits behind [`StreamPublisher`]. The bundled
//! [`UdpStreamPublisher`] emits one JSON datagram per record:
//!
//! ```json
//! {"stream": "ride_predictions", "partition_key": "256", "data": "<base64>"}
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use contracts::{ContractError, PredictionResult, PredictionSink, SinkKind};
use tokio::net::UdpSocket;
use tracing::{debug, instrument};

/// Output stream client
#[trait_variant::make(StreamPublisher: Send)]
pub trait LocalStreamPublisher {
    /// Put one record onto `stream`
    async fn put_record(
        &mut self,
        stream: &str,
        partition_key: &str,
        data: &[u8],
    ) -> Result<(), ContractError>;

    /// Release the connection
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Configuration for UdpStreamPublisher
#[derive(Debug, Clone)]
pub struct UdpPublisherConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Max datagram size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl UdpPublisherConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let max_packet_size = match params.get("max_packet_size") {
            Some(s) => s
                .parse()
                .map_err(|e| format!("invalid max_packet_size '{}': {}", s, e))?,
            None => 65000,
        };

        Ok(Self {
            addr,
            max_packet_size,
        })
    }
}

/// Publisher that sends each record as a UDP datagram
pub struct UdpStreamPublisher {
    name: String,
    config: UdpPublisherConfig,
    socket: Option<UdpSocket>,
}

impl UdpStreamPublisher {
    #[instrument(name = "udp_publisher_connect", skip(name, config), fields(target = %config.addr))]
    pub async fn connect(
        name: impl Into<String>,
        config: UdpPublisherConfig,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&config.addr).await?;

        debug!(sink = %name, target = %config.addr, "UdpStreamPublisher connected");

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))
    }
}

impl StreamPublisher for UdpStreamPublisher {
    async fn put_record(
        &mut self,
        stream: &str,
        partition_key: &str,
        data: &[u8],
    ) -> Result<(), ContractError> {
        let datagram = serde_json::to_vec(&serde_json::json!({
            "stream": stream,
            "partition_key": partition_key,
            "data": STANDARD.encode(data),
        }))
        .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {}", e)))?;

        if datagram.len() > self.config.max_packet_size {
            return Err(ContractError::sink_write(
                &self.name,
                format!(
                    "record of {} bytes exceeds max packet size {}",
                    datagram.len(),
                    self.config.max_packet_size
                ),
            ));
        }

        let sent = self
            .socket()?
            .send(&datagram)
            .await
            .map_err(|e| ContractError::sink_write(&self.name, format!("udp send failed: {}", e)))?;

        debug!(sink = %self.name, stream, partition_key, bytes = sent, "Record published");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        Ok(())
    }
}

/// Sink that republishes the prediction envelope, keyed by `ride_id`
pub struct RepublishSink<P> {
    name: String,
    stream: String,
    publisher: P,
}

impl<P: StreamPublisher> RepublishSink<P> {
    pub fn new(name: impl Into<String>, stream: impl Into<String>, publisher: P) -> Self {
        Self {
            name: name.into(),
            stream: stream.into(),
            publisher,
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}

impl RepublishSink<UdpStreamPublisher> {
    /// Create from params (for factory)
    #[instrument(name = "republish_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let stream = params
            .get("stream")
            .cloned()
            .ok_or_else(|| ContractError::sink_connection(&name, "missing 'stream' parameter"))?;
        let config = UdpPublisherConfig::from_params(params)
            .map_err(|e| ContractError::sink_connection(&name, e))?;

        let publisher = UdpStreamPublisher::connect(name.clone(), config)
            .await
            .map_err(|e| ContractError::sink_connection(&name, e.to_string()))?;

        Ok(Self::new(name, stream, publisher))
    }
}

impl<P: StreamPublisher> PredictionSink for RepublishSink<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Network
    }

    #[instrument(
        name = "republish_sink_write",
        skip(self, result),
        fields(sink = %self.name, ride_id = %result.ride_id)
    )]
    async fn write(&mut self, result: &PredictionResult) -> Result<(), ContractError> {
        let data = serde_json::to_vec(&result.envelope())
            .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {}", e)))?;
        let partition_key = result.ride_id.to_string();

        self.publisher
            .put_record(&self.stream, &partition_key, &data)
            .await
    }

    #[instrument(name = "republish_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "republish_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.publisher.close().await?;
        debug!(sink = %self.name, "RepublishSink closed");
        Ok(())
    }
}
