use crate::cli::Args;
use crate::error::ViewerError;
use crate::websocket::RetryPolicy;
use std::time::Duration;
use url::Url;

/// Validated runtime settings derived from the command line and environment.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub fetch_url: Url,
    pub ws_url: Url,
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
    pub scroll_threshold: f64,
    pub avatar_base_url: String,
    pub bump_on_message: bool,
    pub select: Option<String>,
}

impl ViewerConfig {
    pub fn from_args(args: &Args) -> Result<Self, ViewerError> {
        if args.max_retries == 0 {
            return Err(ViewerError::Config("max retries must be at least 1".to_string()));
        }
        if !args.scroll_threshold.is_finite() || args.scroll_threshold < 0.0 {
            return Err(
                ViewerError::Config(
                    format!("invalid scroll threshold: {}", args.scroll_threshold)
                )
            );
        }

        let (http_scheme, ws_scheme) = if args.enable_tls {
            ("https", "wss")
        } else {
            ("http", "ws")
        };

        Ok(Self {
            fetch_url: endpoint(http_scheme, &args.server_host, args.server_port, &args.fetch_path)?,
            ws_url: endpoint(ws_scheme, &args.server_host, args.server_port, &args.ws_path)?,
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
            retry: RetryPolicy {
                max_attempts: args.max_retries,
                interval: Duration::from_millis(args.retry_interval_ms),
            },
            scroll_threshold: args.scroll_threshold,
            avatar_base_url: args.avatar_base_url.clone(),
            bump_on_message: args.bump_on_message,
            select: args.select.clone().filter(|id| !id.is_empty()),
        })
    }
}

fn endpoint(scheme: &str, host: &str, port: u16, path: &str) -> Result<Url, ViewerError> {
    let base = Url::parse(&format!("{}://{}:{}/", scheme, host, port))?;
    Ok(base.join(path.trim_start_matches('/'))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["chat-viewer"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_point_at_local_server() {
        let config = ViewerConfig::from_args(&args(&[])).unwrap();
        assert_eq!(config.fetch_url.as_str(), "http://127.0.0.1:7788/fetch_chat_record");
        assert_eq!(config.ws_url.as_str(), "ws://127.0.0.1:7788/chatlist_ws");
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.scroll_threshold, 5.0);
        assert!(!config.bump_on_message);
        assert_eq!(config.select, None);
    }

    #[test]
    fn host_port_and_tls_are_configurable() {
        let config = ViewerConfig::from_args(
            &args(&["--server-host", "chat.local", "--server-port", "9000", "--enable-tls", "--ws-path", "live"])
        ).unwrap();
        assert_eq!(config.fetch_url.as_str(), "https://chat.local:9000/fetch_chat_record");
        assert_eq!(config.ws_url.as_str(), "wss://chat.local:9000/live");
    }

    #[test]
    fn zero_retries_is_rejected() {
        let err = ViewerConfig::from_args(&args(&["--max-retries", "0"])).unwrap_err();
        assert!(matches!(err, ViewerError::Config(_)));
    }

    #[test]
    fn bad_host_is_rejected() {
        let err = ViewerConfig::from_args(&args(&["--server-host", "bad host"])).unwrap_err();
        assert!(matches!(err, ViewerError::Url(_)));
    }
}
