/// Install the process-wide logger. `RUST_LOG` wins over the default filter.
/// Calling it more than once is harmless.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .try_init();
}
