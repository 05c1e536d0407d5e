//! Feed client — the tokio connection loop for the upstream data feed.
//!
//! Connects, forwards received bytes and connection transitions to the
//! gateway loop over a channel, writes out frames handed to it, and
//! reconnects with a fixed backoff when the connection drops. All
//! protocol logic stays in the gateway loop; this task only moves bytes.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::config::FeedConfig;

/// What the feed task reports to the gateway loop.
#[derive(Debug)]
pub enum FeedSignal {
    Connected,
    Disconnected,
    Data(Vec<u8>),
}

/// Write side of the feed connection, held by the gateway loop.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    frames: mpsc::UnboundedSender<Vec<u8>>,
}

impl FeedHandle {
    /// Queue one already-framed payload for the wire. Dropped (with a
    /// log) when the connection is down.
    pub fn send_frame(&self, frame: Vec<u8>) {
        if self.frames.send(frame).is_err() {
            tracing::warn!("feed connection task gone, frame dropped");
        }
    }
}

/// Spawn the feed client task.
///
/// Returns the write handle; received bytes and connection transitions
/// arrive on `signals`.
pub fn spawn(config: FeedConfig, signals: mpsc::UnboundedSender<FeedSignal>) -> FeedHandle {
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    tokio::spawn(run(config, signals, frame_rx));
    FeedHandle { frames: frame_tx }
}

async fn run(
    config: FeedConfig,
    signals: mpsc::UnboundedSender<FeedSignal>,
    mut frames: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let addr = format!("{}:{}", config.host, config.port);
    let backoff = Duration::from_secs(config.reconnect_secs);

    loop {
        tracing::info!(%addr, "connecting to feed");
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                tracing::info!(%addr, "feed connected");
                if signals.send(FeedSignal::Connected).is_err() {
                    return;
                }
                serve(stream, &signals, &mut frames).await;
                tracing::warn!(%addr, "feed disconnected");
                if signals.send(FeedSignal::Disconnected).is_err() {
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(%addr, %err, "feed connect failed");
            }
        }
        tokio::time::sleep(backoff).await;
    }
}

/// Shovel bytes in both directions until the connection drops.
async fn serve(
    stream: TcpStream,
    signals: &mpsc::UnboundedSender<FeedSignal>,
    frames: &mut mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let (mut reader, mut writer) = stream.into_split();
    let mut buf = vec![0u8; 4096];
    loop {
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => return,
                Ok(n) => {
                    if signals.send(FeedSignal::Data(buf[..n].to_vec())).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "feed read failed");
                    return;
                }
            },
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if let Err(err) = writer.write_all(&frame).await {
                        tracing::warn!(%err, "feed write failed");
                        return;
                    }
                }
                None => return,
            },
        }
    }
}
