use std::path::Path;
use anyhow::Result;
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    Config,
};

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{h({l})} {t}] {m}{n}";
const CRATE_TARGET: &str = "hdf5_persist";

/// Installs the logger used by the binaries.
///
/// Records of this crate are emitted at `level` and records of other crates at `warn`
/// at most, so that a `trace` run shows node handling without library noise. Output
/// goes to stderr, keeping stdout for the node listing, and is also appended to
/// `log_file` when given.
pub fn init_log(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let mut appenders = vec!["stderr"];
    let mut config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)));
    if let Some(path) = log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(path)?;
        config = config.appender(Appender::builder().build("file", Box::new(file)));
        appenders.push("file");
    }

    let config = config
        .logger(Logger::builder()
            .appenders(appenders.iter().copied())
            .additive(false)
            .build(CRATE_TARGET, level))
        .build(Root::builder()
            .appenders(appenders.iter().copied())
            .build(level.min(LevelFilter::Warn)))?;
    log4rs::init_config(config)?;
    update_panic_hook();

    Ok(())
}

fn update_panic_hook() {
    let hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        log::error!("PANIC => {}", info);
        hook(info);
    }));
}
