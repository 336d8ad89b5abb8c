use crate::config::LoggingConfig;
use std::io;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Env var that forces JSON log lines regardless of config
pub const LOG_JSON_ENV: &str = "CASH_DRAWER_LOG_JSON";

/// Install the global subscriber. `RUST_LOG` overrides the configured
/// filter. Safe to call twice; the second call is a no-op.
pub fn init_logging(cfg: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.filter));

    let json_logging = cfg.json || std::env::var(LOG_JSON_ENV).is_ok();

    // stdout carries command output (`--json` reports), so logs never go there.
    if build_subscriber(env_filter, json_logging, io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn build_subscriber<W>(
    env_filter: EnvFilter,
    json: bool,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        Box::new(
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_writer(writer)
                .finish(),
        )
    } else {
        Box::new(
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(writer)
                .finish(),
        )
    }
}
