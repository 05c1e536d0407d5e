//! Console listener — the tokio accept loop for the operator console.
//!
//! Serves one operator connection at a time (the console shares one
//! protocol state in the gateway loop). Received bytes go to the gateway
//! over the signal channel; replies come back over a per-connection
//! channel handed out with [`ConsoleSignal::Connected`].

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::config::ControlConfig;

/// What the console task reports to the gateway loop.
#[derive(Debug)]
pub enum ConsoleSignal {
    /// A connection was accepted; replies go into the enclosed sender.
    Connected(mpsc::UnboundedSender<ConsoleReply>),
    Data(Vec<u8>),
    Disconnected,
}

/// One chunk of reply bytes, optionally closing the connection after.
#[derive(Debug)]
pub struct ConsoleReply {
    pub output: Vec<u8>,
    pub close: bool,
}

/// Spawn the console listener task.
pub fn spawn(config: ControlConfig, signals: mpsc::UnboundedSender<ConsoleSignal>) {
    tokio::spawn(run(config, signals));
}

async fn run(config: ControlConfig, signals: mpsc::UnboundedSender<ConsoleSignal>) {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, %err, "console listener failed to bind");
            return;
        }
    };
    tracing::info!(%addr, "console listening");

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::info!(%peer, "console connection accepted");
                serve(stream, &signals).await;
                tracing::info!(%peer, "console connection closed");
                if signals.send(ConsoleSignal::Disconnected).is_err() {
                    return;
                }
            }
            Err(err) => tracing::warn!(%err, "console accept failed"),
        }
    }
}

async fn serve(stream: TcpStream, signals: &mpsc::UnboundedSender<ConsoleSignal>) {
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ConsoleReply>();
    if signals.send(ConsoleSignal::Connected(reply_tx)).is_err() {
        return;
    }

    let (mut reader, mut writer) = stream.into_split();
    let mut buf = vec![0u8; 1024];
    loop {
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => return,
                Ok(n) => {
                    if signals.send(ConsoleSignal::Data(buf[..n].to_vec())).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "console read failed");
                    return;
                }
            },
            reply = reply_rx.recv() => match reply {
                Some(reply) => {
                    if writer.write_all(&reply.output).await.is_err() || reply.close {
                        return;
                    }
                }
                None => return,
            },
        }
    }
}
