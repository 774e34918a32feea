use clap::Parser;

/// relayport: publish and subscribe on a hosted WebSocket relay.
///
/// Inbound messages are printed as JSON lines. Each line read from
/// stdin is sent to the topic, as JSON when it parses and as a string
/// otherwise.
#[derive(Parser, Debug)]
#[command(name = "relayport", version, about)]
pub struct Args {
    /// Service identifier: achex, piesocket, <cluster>.piesocket,
    /// scaledrone, a ws:// or wss:// URL, or a name from [hosts].
    /// Falls back to `relay.service` from the config file.
    pub service: Option<String>,

    /// Topic to subscribe to. Falls back to `relay.default_topic`.
    pub topic: Option<String>,

    /// Service token. Falls back to `relay.token`.
    #[arg(short = 't', long)]
    pub token: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log filter override (e.g. debug, relayport=trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Seconds to wait for the relay to accept us. 0 waits forever.
    #[arg(long)]
    pub open_timeout: Option<u64>,

    /// Origin header for the WebSocket upgrade.
    #[arg(long)]
    pub origin: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
