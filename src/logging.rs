//! Injected logging handle.
//!
//! Components never reach for the global `log` macros. Each call receives a
//! [`Logger`] that forwards to an explicit [`log::Log`] sink under a
//! per-stage target, so one pipeline invocation can be observed in
//! isolation.

use log::{Level, Log, Record};
use std::fmt;

#[derive(Clone, Copy)]
pub struct Logger<'a> {
    sink: &'a dyn Log,
    target: &'a str,
}

impl<'a> Logger<'a> {
    pub fn new(sink: &'a dyn Log, target: &'a str) -> Self {
        Self { sink, target }
    }

    /// Same sink, different target.
    pub fn scoped(&self, target: &'a str) -> Self {
        Self::new(self.sink, target)
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let record = Record::builder()
            .args(args)
            .level(level)
            .target(self.target)
            .module_path_static(Some(module_path!()))
            .build();
        if self.sink.enabled(record.metadata()) {
            self.sink.log(&record);
        }
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }
}

impl fmt::Debug for Logger<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CaptureSink;

    #[test]
    fn records_carry_level_and_target() {
        let sink = CaptureSink::default();
        let logger = Logger::new(&sink, "sensorwatch::clean");

        logger.info(format_args!("loaded {} rows", 3));
        logger.scoped("sensorwatch::detect").warn(format_args!("degraded"));

        let lines = sink.lines();
        assert_eq!(
            lines,
            vec![
                (Level::Info, "sensorwatch::clean".to_owned(), "loaded 3 rows".to_owned()),
                (Level::Warn, "sensorwatch::detect".to_owned(), "degraded".to_owned()),
            ]
        );
    }
}
