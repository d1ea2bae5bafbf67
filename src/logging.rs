use env_logger::{Builder, Env};

/// Environment variable holding the `env_logger` filter, e.g. `RUST_LOG=ratings_predictor=debug`.
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

fn default_filter(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

fn builder(env: Env<'_>) -> Builder {
    let mut builder = Builder::from_env(env);
    builder.format_timestamp(None);
    builder
}

/// Installs the process-wide logger for the command-line tools. The filter comes from
/// `RUST_LOG` when set, otherwise `info` (`debug` with `verbose`). A second call is a no-op.
pub fn init(verbose: bool) {
    let env = Env::new().filter_or(LOG_FILTER_ENV, default_filter(verbose));
    let _ = builder(env).try_init();
}

#[cfg(test)]
mod tests {
    use log::LevelFilter;

    use super::*;

    // An unset variable name keeps the host environment out of the result.
    const UNSET: &str = "RATINGS_PREDICTOR_TEST_FILTER_UNSET";

    #[test]
    fn warnings_pass_the_default_filter() {
        let logger = builder(Env::new().filter_or(UNSET, default_filter(false))).build();
        assert_eq!(logger.filter(), LevelFilter::Info);
        assert!(logger.filter() >= log::Level::Warn);
    }

    #[test]
    fn verbose_lowers_the_filter_to_debug() {
        let logger = builder(Env::new().filter_or(UNSET, default_filter(true))).build();
        assert_eq!(logger.filter(), LevelFilter::Debug);
    }
}
