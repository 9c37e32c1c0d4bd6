use async_trait::async_trait;
use log::{debug, info};
use room_core::Error;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Dials the upstream and services it while it is up.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send {
    /// Establish the link.
    async fn connect(&mut self) -> Result<(), Error>;

    /// Drive the established link until it drops, returning the reason.
    async fn serve(&mut self) -> String;
}

/// Line-oriented TCP link.
///
/// Every line received is forwarded verbatim; interpreting it is up to the
/// receiver.
pub struct TcpConnector {
    address: SocketAddr,
    stream: Option<TcpStream>,
    lines: mpsc::Sender<String>,
}

impl TcpConnector {
    pub fn new(address: SocketAddr, lines: mpsc::Sender<String>) -> Self {
        Self {
            address,
            stream: None,
            lines,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&mut self) -> Result<(), Error> {
        let stream = TcpStream::connect(self.address)
            .await
            .map_err(|e| Error::Network(format!("connect to {} failed: {}", self.address, e)))?;
        info!("Connected to {}", self.address);
        self.stream = Some(stream);
        Ok(())
    }

    async fn serve(&mut self) -> String {
        let Some(stream) = self.stream.take() else {
            return "not connected".to_string();
        };

        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if self.lines.send(line).await.is_err() {
                        return "receiver closed".to_string();
                    }
                }
                Ok(None) => return "closed by peer".to_string(),
                Err(e) => {
                    debug!("Read from {} failed: {}", self.address, e);
                    return e.to_string();
                }
            }
        }
    }
}
