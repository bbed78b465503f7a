use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host of the messaging server.
    #[arg(long, env = "SERVER_HOST", default_value = "127.0.0.1")]
    pub server_host: String,

    /// Port of the messaging server (HTTP and WebSocket share it).
    #[arg(long, env = "SERVER_PORT", default_value = "7788")]
    pub server_port: u16,

    /// Path of the chat list WebSocket endpoint.
    #[arg(long, env = "WS_PATH", default_value = "/chatlist_ws")]
    pub ws_path: String,

    /// Path of the bulk chat record endpoint.
    #[arg(long, env = "FETCH_PATH", default_value = "/fetch_chat_record")]
    pub fetch_path: String,

    /// Use wss:// and https:// instead of ws:// and http://
    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Timeout in seconds for the chat record request.
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "30")]
    pub fetch_timeout_secs: u64,

    // --- Live Channel Args ---
    /// Delay in milliseconds between two connection attempts.
    #[arg(long, env = "RETRY_INTERVAL_MS", default_value = "3000")]
    pub retry_interval_ms: u64,

    /// Consecutive failed connection attempts before giving up for the session.
    #[arg(long, env = "MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,

    // --- View Args ---
    /// Distance from the bottom under which the message view keeps following new messages.
    #[arg(long, env = "SCROLL_THRESHOLD", default_value = "5")]
    pub scroll_threshold: f64,

    /// Base URL the avatar number is appended to.
    #[arg(long, env = "AVATAR_BASE_URL", default_value = "https://avatar.iran.liara.run/public/")]
    pub avatar_base_url: String,

    /// Move a conversation to the top of the list whenever it receives a message.
    #[arg(long, env = "BUMP_ON_MESSAGE", default_value = "false")]
    pub bump_on_message: bool,

    /// Conversation id to open on startup.
    #[arg(long = "select", env = "SELECT_COMM_ID")]
    pub select: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
