//! Gateway reactor loop — the single logical thread of the system.
//!
//! All table mutation, expression evaluation and automation execution
//! happen here, one message at a time: feed bytes, console input, timer
//! ticks and raw-send requests are drained from channels and each is
//! processed to completion before the next. The adapters only move bytes
//! at the edges.

use std::time::Duration;

use tokio::sync::mpsc;

use feedgate_adapter_http::{HttpFanout, HttpRequest};
use feedgate_adapter_net::console::{ConsoleReply, ConsoleSignal};
use feedgate_adapter_net::ctrl::{ControlEffect, CtrlProtocol};
use feedgate_adapter_net::data::DataProtocol;
use feedgate_adapter_net::feed::{FeedHandle, FeedSignal};
use feedgate_adapter_net::protocol::{Protocol, ProtocolOutcome};
use feedgate_app::automation_engine::AutomationEngine;
use feedgate_app::context::GatewayContext;
use feedgate_app::ports::Dispatcher;
use feedgate_domain::event::AutomationEvent;
use feedgate_domain::script::{HttpMethod, Script};

/// Dispatcher wired to the HTTP fan-out and back into the gateway loop
/// for raw feed sends.
pub struct GatewayDispatcher {
    http: HttpFanout,
    raw: mpsc::UnboundedSender<Vec<u8>>,
}

impl GatewayDispatcher {
    #[must_use]
    pub fn new(http: HttpFanout, raw: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { http, raw }
    }
}

impl Dispatcher for GatewayDispatcher {
    fn send_raw(&self, payload: &[u8]) {
        // Routed back through the loop so the data protocol can frame and
        // queue it.
        let _ = self.raw.send(payload.to_vec());
    }

    fn send_http(&self, method: HttpMethod, url: &str, body: String) {
        self.http.send(HttpRequest {
            method,
            path: url.to_string(),
            body,
        });
    }
}

/// Channels feeding the gateway loop.
pub struct GatewayChannels {
    pub feed_signals: mpsc::UnboundedReceiver<FeedSignal>,
    pub console_signals: mpsc::UnboundedReceiver<ConsoleSignal>,
    pub raw_requests: mpsc::UnboundedReceiver<Vec<u8>>,
    pub timer_ticks: mpsc::UnboundedReceiver<u64>,
}

/// The gateway: owns the context, the protocols and the engine.
pub struct Gateway {
    ctx: GatewayContext,
    engine: AutomationEngine<GatewayDispatcher>,
    feed_protocol: Protocol,
    console_protocol: Protocol,
    feed: FeedHandle,
    console_reply: Option<mpsc::UnboundedSender<ConsoleReply>>,
    paused: bool,
    dump_path: String,
    response_timeout: Duration,
}

impl Gateway {
    #[must_use]
    pub fn new(
        script: Script,
        dispatcher: GatewayDispatcher,
        feed: FeedHandle,
        target_names: Vec<String>,
        dump_path: String,
        response_timeout: Duration,
    ) -> Self {
        let feed_protocol = Protocol::Data(DataProtocol::new());
        let console_protocol = Protocol::Ctrl(CtrlProtocol::new(target_names));
        Self {
            ctx: GatewayContext::new(),
            engine: AutomationEngine::new(script, dispatcher),
            feed_protocol,
            console_protocol,
            feed,
            console_reply: None,
            paused: false,
            dump_path,
            response_timeout,
        }
    }

    /// Preload tables from an earlier dump; missing files are fine.
    pub fn restore_tables(&mut self) {
        match self.ctx.tables.load_from_file(&self.dump_path) {
            Ok(()) => tracing::info!(path = %self.dump_path, "tables restored from dump"),
            Err(err) => tracing::debug!(path = %self.dump_path, %err, "no tables restored"),
        }
    }

    /// Run until terminated (console `terminate` or SIGINT).
    pub async fn run(mut self, mut channels: GatewayChannels) {
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            let awaiting = self.feed_protocol.awaiting_response();
            let control = tokio::select! {
                signal = channels.feed_signals.recv() => match signal {
                    Some(signal) => self.on_feed_signal(signal),
                    None => LoopControl::Stop,
                },
                signal = channels.console_signals.recv() => match signal {
                    Some(signal) => self.on_console_signal(signal),
                    None => LoopControl::Continue,
                },
                payload = channels.raw_requests.recv() => match payload {
                    Some(payload) => {
                        let frames = self.feed_protocol.write(&payload);
                        self.send_frames(frames);
                        LoopControl::Continue
                    }
                    None => LoopControl::Continue,
                },
                tick = channels.timer_ticks.recv() => match tick {
                    Some(interval) => {
                        self.run_trigger(&AutomationEvent::Timer { interval });
                        LoopControl::Continue
                    }
                    None => LoopControl::Continue,
                },
                () = tokio::time::sleep(self.response_timeout), if awaiting => {
                    let frames = self.feed_protocol.on_response_timeout();
                    self.send_frames(frames);
                    LoopControl::Continue
                }
                _ = &mut shutdown => {
                    tracing::info!("interrupt received, shutting down");
                    LoopControl::Stop
                }
            };

            if matches!(control, LoopControl::Stop) {
                break;
            }
        }

        self.dump_tables(None);
        tracing::info!("gateway finished");
    }

    fn on_feed_signal(&mut self, signal: FeedSignal) -> LoopControl {
        match signal {
            FeedSignal::Connected => {
                let outcome = self.feed_protocol.on_connected(&mut self.ctx.tables);
                self.apply(outcome)
            }
            FeedSignal::Data(bytes) => {
                let outcome = self
                    .feed_protocol
                    .on_read(&bytes, &mut self.ctx.tables, self.paused);
                self.apply(outcome)
            }
            FeedSignal::Disconnected => {
                self.feed_protocol.on_disconnected();
                LoopControl::Continue
            }
        }
    }

    fn on_console_signal(&mut self, signal: ConsoleSignal) -> LoopControl {
        match signal {
            ConsoleSignal::Connected(reply) => {
                self.console_reply = Some(reply);
                let outcome = self.console_protocol.on_connected(&mut self.ctx.tables);
                self.apply(outcome)
            }
            ConsoleSignal::Data(bytes) => {
                let outcome =
                    self.console_protocol
                        .on_read(&bytes, &mut self.ctx.tables, self.paused);
                self.apply(outcome)
            }
            ConsoleSignal::Disconnected => {
                self.console_reply = None;
                self.console_protocol.on_disconnected();
                LoopControl::Continue
            }
        }
    }

    /// Apply one protocol outcome: trigger events, forward frames, write
    /// replies, run control effects.
    fn apply(&mut self, outcome: ProtocolOutcome) -> LoopControl {
        for event in &outcome.events {
            self.run_trigger(event);
        }
        self.send_frames(outcome.send_upstream);

        let close = outcome.effects.contains(&ControlEffect::CloseConnection);
        if !outcome.reply.is_empty()
            && let Some(reply) = &self.console_reply
        {
            let _ = reply.send(ConsoleReply {
                output: outcome.reply,
                close,
            });
        }

        for effect in outcome.effects {
            match effect {
                ControlEffect::Pause => {
                    tracing::info!("automation paused");
                    self.paused = true;
                }
                ControlEffect::Resume => {
                    tracing::info!("automation resumed");
                    self.paused = false;
                }
                ControlEffect::Dump(path) => self.dump_tables(path),
                ControlEffect::RawRequest(payload) => {
                    let frames = self.feed_protocol.write(payload.as_bytes());
                    self.send_frames(frames);
                }
                ControlEffect::CloseConnection => self.console_reply = None,
                ControlEffect::Terminate => return LoopControl::Stop,
            }
        }
        LoopControl::Continue
    }

    fn run_trigger(&mut self, event: &AutomationEvent) {
        if self.paused {
            tracing::debug!(%event, "automation paused, event dropped");
            return;
        }
        self.engine.trigger(event, &mut self.ctx);
    }

    fn send_frames(&self, frames: Vec<Vec<u8>>) {
        for frame in frames {
            self.feed.send_frame(frame);
        }
    }

    fn dump_tables(&self, path: Option<String>) {
        let path = path.unwrap_or_else(|| self.dump_path.clone());
        match self.ctx.tables.dump_to_file(&path) {
            Ok(()) => tracing::info!(%path, "tables dumped"),
            Err(err) => tracing::error!(%path, %err, "table dump failed"),
        }
    }
}

enum LoopControl {
    Continue,
    Stop,
}

/// Spawn one ticker per distinct script timer interval.
pub fn spawn_timers(intervals: &[u64], ticks: mpsc::UnboundedSender<u64>) {
    for &interval in intervals {
        if interval == 0 {
            tracing::warn!("zero-second timer entry ignored");
            continue;
        }
        let ticks = ticks.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(Duration::from_secs(interval));
            // The first tick fires immediately; skip it.
            timer.tick().await;
            loop {
                timer.tick().await;
                if ticks.send(interval).is_err() {
                    return;
                }
            }
        });
    }
}
