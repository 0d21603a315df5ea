// crates/server/src/cli.rs
use std::time::Duration;

use clap::{ArgGroup, Parser};
use mcp_facade_core::{BridgeConfig, HeaderSet, RetryPolicy};

pub const DEFAULT_PORT: u16 = 7000;
pub const DEFAULT_HOST: &str = "127.0.0.1";

#[derive(Debug, Parser)]
#[command(name = "mcp-facade", version)]
#[command(about = "Expose a GraphQL long-running job as the MCP tool `long_running_task`.")]
#[command(after_help = "Examples:\n  \
    mcp-facade http://localhost:5000/graphql --listen 7000\n  \
    mcp-facade http://localhost:5000/graphql --header \"Authorization: Bearer TOKEN\"")]
#[command(group(ArgGroup::new("backend_source").required(true).multiple(true).args(["backend_url", "backend"])))]
pub struct Cli {
    /// GraphQL endpoint of the job backend, e.g. http://localhost:5000/graphql
    #[arg(value_name = "BACKEND_URL", env = "MCP_FACADE_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Same as BACKEND_URL; wins when both are given.
    #[arg(long, visible_alias = "backend-url", value_name = "URL")]
    pub backend: Option<String>,

    /// Static header sent with every backend request. Repeatable.
    #[arg(long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Port for the Streamable HTTP endpoint.
    #[arg(long, visible_alias = "port", env = "MCP_FACADE_PORT", default_value_t = DEFAULT_PORT)]
    pub listen: u16,

    #[arg(long, env = "MCP_FACADE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Serve MCP over stdin/stdout instead of HTTP.
    #[arg(long)]
    pub stdio: bool,

    /// Retries of the start request after the first attempt.
    #[arg(long, default_value_t = 5)]
    pub retries: u32,

    #[arg(long, default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// Interval between keepalive notifications while a job is quiet.
    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..))]
    pub heartbeat_ms: u64,
}

impl Cli {
    pub fn backend_url(&self) -> Option<&str> {
        self.backend.as_deref().or(self.backend_url.as_deref())
    }

    /// Bridge configuration, or `None` without a backend URL.
    pub fn bridge_config(&self) -> Option<BridgeConfig> {
        let config = BridgeConfig::new(self.backend_url()?)
            .with_headers(HeaderSet::from_lines(&self.headers))
            .with_retry(RetryPolicy {
                retries: self.retries,
                delay: Duration::from_millis(self.retry_delay_ms),
            })
            .with_heartbeat_interval(Duration::from_millis(self.heartbeat_ms));
        Some(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.listen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        try_parse(args).unwrap()
    }

    fn try_parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("mcp-facade").chain(args.iter().copied()))
    }

    #[test]
    fn test_positional_backend_and_defaults() {
        let cli = parse(&["http://localhost:5000/graphql"]);
        assert_eq!(cli.backend_url(), Some("http://localhost:5000/graphql"));
        assert_eq!(cli.listen_addr(), "127.0.0.1:7000");
        assert!(!cli.stdio);

        let config = cli.bridge_config().unwrap();
        assert_eq!(config.channel_url, "ws://localhost:5000/graphql");
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.heartbeat_interval, Duration::from_millis(5000));
    }

    #[test]
    fn test_aliases_and_repeated_headers() {
        let cli = parse(&[
            "--backend-url",
            "https://api.example.com/graphql",
            "--port",
            "8123",
            "--header",
            "Authorization: Bearer abc",
            "--header",
            "X-Tenant: acme",
            "--header",
            "garbage",
        ]);
        assert_eq!(cli.listen, 8123);
        let config = cli.bridge_config().unwrap();
        assert_eq!(config.channel_url, "wss://api.example.com/graphql");
        assert_eq!(config.static_headers.len(), 2);
        assert_eq!(config.static_headers.get("authorization"), Some("Bearer abc"));
    }

    #[test]
    fn test_flag_wins_over_positional() {
        let cli = parse(&["http://a/graphql", "--backend", "http://b/graphql"]);
        assert_eq!(cli.backend_url(), Some("http://b/graphql"));
    }

    #[test]
    fn test_tuning_flags() {
        let cli = parse(&[
            "http://a/graphql",
            "--retries",
            "2",
            "--retry-delay-ms",
            "50",
            "--heartbeat-ms",
            "250",
            "--stdio",
        ]);
        let config = cli.bridge_config().unwrap();
        assert!(cli.stdio);
        assert_eq!(config.retry.retries, 2);
        assert_eq!(config.retry.delay, Duration::from_millis(50));
        assert_eq!(config.heartbeat_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_heartbeat_is_rejected() {
        let err = try_parse(&["http://a/graphql", "--heartbeat-ms", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
