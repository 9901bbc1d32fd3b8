use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Log settings for one process run, derived from the `-v` count.
///
/// `RUST_LOG` directives still apply on top of the chosen level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    level: LevelFilter,
}

impl LogConfig {
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        Self { level }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Install the global subscriber. Logs go to stderr so stdout carries
    /// only the rendered result.
    pub fn install(&self) {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive(self.level.into()))
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(LogConfig::from_verbosity(0).level(), LevelFilter::ERROR);
        assert_eq!(LogConfig::from_verbosity(1).level(), LevelFilter::INFO);
        assert_eq!(LogConfig::from_verbosity(2).level(), LevelFilter::DEBUG);
        assert_eq!(LogConfig::from_verbosity(9).level(), LevelFilter::TRACE);
    }
}
