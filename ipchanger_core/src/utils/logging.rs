use env_logger::Env;

/// Initialize logging using env_logger.
/// By default, this reads the RUST_LOG environment variable for filtering and
/// falls back to `info`, e.g. `RUST_LOG=ipchanger_core=debug ipchanger apply Work`.
pub fn init_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
}
