use std::io;
use tracing::Subscriber;
use tracing_appender::rolling;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONSOLE_FILTER: &str = "info,web_request=info,schedule=info,reqwest=warn,hyper=warn";
const DEFAULT_FILE_FILTER: &str = "info,web_request=debug,schedule=debug,hyper=info";

/// Stream the console log layer writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleOutput {
    #[default]
    Stdout,
    /// Keeps stdout free for machine-readable output.
    Stderr,
}

pub fn configure_logging() {
    configure_logging_to(ConsoleOutput::Stdout);
}

pub fn configure_logging_to(output: ConsoleOutput) {
    // RUST_LOG wins over the built-in console filter
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_FILTER));

    let file_appender = rolling::daily("logs", "feedwatch.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(EnvFilter::new(DEFAULT_FILE_FILTER));

    let registry = tracing_subscriber::Registry::default().with(file_log);

    // A subscriber may already be installed (tests, embedding applications)
    let _ = match output {
        ConsoleOutput::Stdout => registry
            .with(console_layer(io::stdout, console_filter))
            .try_init(),
        ConsoleOutput::Stderr => registry
            .with(console_layer(io::stderr, console_filter))
            .try_init(),
    };
}

fn console_layer<S, W>(writer: W, filter: EnvFilter) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer().with_writer(writer).with_filter(filter)
}
