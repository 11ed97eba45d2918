use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "info";

/// Install the stderr subscriber.
///
/// `filter` (from `QUAKESTACK_LOG`) wins over the verbosity default. Later
/// calls are no-ops once a global subscriber is set.
pub fn init(filter: Option<&str>, verbose: bool) {
    let fallback = if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };
    let env_filter = filter
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback));

    // Err only when a global subscriber already exists; the first one keeps its filter.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
