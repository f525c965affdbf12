use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

/// Builds the stderr subscriber for one invocation; `RUST_LOG` overrides the default level.
pub(crate) fn build_subscriber(verbose: bool) -> impl Subscriber + Send + Sync {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
}
