//! Logging setup: a single global `tracing` subscriber, either writing to
//! stdout (tests, embedding) or to a timestamped file per run.

use std::fs::File;

use time::{format_description::parse, OffsetDateTime};
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, FmtSubscriber};

/// Where log output goes.
pub enum LogTarget {
    /// A timestamped file in the current directory.
    File,
    /// Standard output, ANSI-colored.
    Stdout,
}

/// Installs the global `tracing` subscriber. Panics on failure — a
/// logging setup failure this early is not something the crate tries to
/// recover from.
pub fn init_logger() {
    init_logger_with(LogTarget::File)
}

/// Like [`init_logger`], but lets the caller choose the target.
pub fn init_logger_with(target: LogTarget) {
    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        local_offset,
        parse("[year]-[month]-[day] [hour]:[minute]:[second]").unwrap(),
    );

    let (writer, ansi) = match target {
        LogTarget::File => {
            let file = File::create(get_log_file_name()).expect("could not create log file");
            (BoxMakeWriter::new(file), false)
        }
        LogTarget::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_ansi(ansi)
        .with_timer(timer)
        .with_writer(writer)
        .finish();

    set_global_default(subscriber).expect(
        "could not set global default tracing subscriber; disable logging if one is already set",
    );
}

fn get_log_file_name() -> String {
    let format = parse("[year]-[month]-[day]_[hour]-[minute]-[second]_arena.log").unwrap();
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&format).unwrap()
}
