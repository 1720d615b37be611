/// Initializes `env_logger` from `RUST_LOG`, defaulting to `info` when unset.
/// Both binaries call this first thing in `main`.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
