use env_logger::{Builder, Env, Target};

/// Routes `log` output to stderr so stdout only carries report and prediction
/// lines. `RUST_LOG` wins over the default level.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let result = Builder::from_env(Env::default().default_filter_or(default_level))
        .target(Target::Stderr)
        .format_timestamp(None)
        .try_init();

    if result.is_err() {
        debug!("Logger already initialised");
    }
}
