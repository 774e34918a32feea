//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r#"# relayport configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[relay]
# service = "achex"        # achex, piesocket, <cluster>.piesocket, scaledrone,
#                          # wss://host, or a name from [hosts]
# token = ""
# default_topic = ""       # empty = a topic must be given

[connection]
# open_timeout_secs = 15   # 0-300, 0 waits forever
# origin = ""              # Origin header for the WebSocket upgrade

[keepalive]
# interval_secs = 45       # 5-55
# idle_hosts = ["herokuapp.com"]

# Named relay hosts. Defining this table replaces the built-in presets.
# [hosts]
# chirimentest = "wss://chirimen-web-socket-relay.herokuapp.com"
# chirimentestlocal = "ws://localhost:3000"

[logging]
# level = "INFO"           # DEBUG, INFO, WARNING, ERROR
"#
}
