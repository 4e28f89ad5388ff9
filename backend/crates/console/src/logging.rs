use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// JSON file log with daily rotation plus a human-readable stderr layer.
/// stdout is left to command output.
pub fn init_logging(log_dir: &str) {
    let file_appender = rolling::daily(log_dir, "console.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,promeconfig_console=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
}
