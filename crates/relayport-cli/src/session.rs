//! Builds a relay from CLI arguments and config, then bridges it to
//! stdin/stdout until interrupted.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use relayport::{
    ChannelEvent, HostBindings, KeepalivePolicy, Relay, RelayOptions, SocketProvider,
    TungsteniteProvider,
};
use relayport_common::RelayError;
use relayport_config::RelayportConfig;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::cli::Args;

/// Everything needed to open one channel.
#[derive(Debug)]
pub struct SessionPlan {
    pub service: String,
    pub topic: String,
    pub token: String,
    pub origin: Option<String>,
    pub bindings: HostBindings,
    pub options: RelayOptions,
}

impl SessionPlan {
    /// Merge CLI arguments over the config file.
    pub fn resolve(args: &Args, config: &RelayportConfig) -> Self {
        let timeout_secs = args
            .open_timeout
            .unwrap_or(u64::from(config.connection.open_timeout_secs));
        let default_topic = Some(config.relay.default_topic.clone()).filter(|t| !t.is_empty());
        let origin = args
            .origin
            .clone()
            .or_else(|| Some(config.connection.origin.clone()))
            .filter(|o| !o.is_empty());

        Self {
            service: args
                .service
                .clone()
                .unwrap_or_else(|| config.relay.service.clone()),
            topic: args.topic.clone().unwrap_or_default(),
            token: args
                .token
                .clone()
                .unwrap_or_else(|| config.relay.token.clone()),
            origin,
            bindings: HostBindings::from(config.hosts.0.clone()),
            options: RelayOptions {
                open_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
                default_topic,
                keepalive: KeepalivePolicy {
                    interval: Duration::from_secs(u64::from(config.keepalive.interval_secs)),
                    idle_hosts: config.keepalive.idle_hosts.clone(),
                },
            },
        }
    }

    fn provider(&self) -> Arc<dyn SocketProvider> {
        match &self.origin {
            Some(origin) => Arc::new(TungsteniteProvider::with_origin(origin.clone())),
            None => Arc::new(TungsteniteProvider::new()),
        }
    }
}

/// Subscribe and pump messages until Ctrl-C or the relay goes away.
pub async fn run(plan: SessionPlan) -> Result<(), RelayError> {
    let relay = Relay::configured(
        &plan.service,
        &plan.token,
        plan.provider(),
        &plan.bindings,
        plan.options.clone(),
    )?;
    info!(backend = %relay.backend().name(), "Relay ready");

    let channel = relay.subscribe(&plan.topic).await?;
    info!(backend = %channel.backend_name(), topic = %channel.topic(), "Subscribed");

    channel.set_message_handler(|message| match serde_json::to_string(&message) {
        Ok(line) => {
            let mut stdout = std::io::stdout().lock();
            if writeln!(stdout, "{line}").and_then(|_| stdout.flush()).is_err() {
                debug!("stdout closed, message dropped");
            }
        }
        Err(e) => warn!(error = %e, "Failed to render message"),
    });

    let mut diagnostics = channel.diagnostics();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    channel.send(&outbound_payload(&line))?;
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!("stdin closed, listening only");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "stdin read failed, listening only");
                    stdin_open = false;
                }
            },
            event = diagnostics.recv() => match event {
                Ok(ChannelEvent::DecodeFailed { reason }) => {
                    debug!(reason = %reason, "Inbound frame dropped");
                }
                Ok(ChannelEvent::Closed) => {
                    info!("Relay closed the channel");
                    return Ok(());
                }
                Ok(ChannelEvent::TransportError { reason }) => {
                    return Err(RelayError::Connect(reason));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Diagnostics lagged");
                }
                Err(RecvError::Closed) => return Err(RelayError::Closed),
            },
            _ = &mut shutdown => {
                info!("Interrupted, closing channel");
                return Ok(());
            }
        }
    }
}

/// A stdin line as a payload: JSON when it parses, a string otherwise.
fn outbound_payload(line: &str) -> Value {
    serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()))
}
