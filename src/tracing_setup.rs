use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::models::LogFormat;

/// Initialize logging with the given `EnvFilter` directive and output format.
/// `RUST_LOG`, when set, takes priority over `level`.
pub fn init_tracing_with_config(level: &str, format: LogFormat) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .wrap_err_with(|| format!("Invalid log level: {level}"))?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let registry = Registry::default().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(fmt_layer.json().with_current_span(true).with_span_list(false))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt_layer.pretty().with_ansi(true)).try_init(),
    }
    .wrap_err("Failed to install tracing subscriber")?;

    tracing::info!("zproxy logging initialized (level: {}, format: {:?})", level, format);
    Ok(())
}

/// Span covering one dispatched request. `http.status_code` is recorded once
/// the handler has answered.
pub fn create_request_span(
    method: &str,
    host: &str,
    path: &str,
    request_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "request",
        http.method = method,
        http.host = host,
        http.path = path,
        request.id = request_id,
        http.status_code = tracing::field::Empty,
    )
}
