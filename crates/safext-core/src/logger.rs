//! Logging capability handed to the extraction core.
//!
//! The core never installs a global logger. By default it forwards to the
//! [`log`] facade; binaries decide where records end up.

use std::fmt;
use std::fmt::Write as _;

/// Key/value pairs attached to a log record.
pub type Fields<'a> = &'a [(&'a str, &'a dyn fmt::Display)];

/// Structured logging sink with four severities.
pub trait Logger: Send + Sync {
    /// Diagnostic detail.
    fn debug(&self, msg: &str, fields: Fields<'_>);
    /// Normal progress.
    fn info(&self, msg: &str, fields: Fields<'_>);
    /// Something was skipped or done insecurely on request.
    fn warn(&self, msg: &str, fields: Fields<'_>);
    /// An operation failed.
    fn error(&self, msg: &str, fields: Fields<'_>);
}

/// Forwards records to the `log` crate under the `safext` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLogger;

const TARGET: &str = "safext";

fn render(msg: &str, fields: Fields<'_>) -> String {
    let mut out = String::from(msg);
    for (key, value) in fields {
        let _ = write!(out, " {key}={value}");
    }
    out
}

impl Logger for LogLogger {
    fn debug(&self, msg: &str, fields: Fields<'_>) {
        if log::log_enabled!(target: TARGET, log::Level::Debug) {
            log::debug!(target: TARGET, "{}", render(msg, fields));
        }
    }

    fn info(&self, msg: &str, fields: Fields<'_>) {
        if log::log_enabled!(target: TARGET, log::Level::Info) {
            log::info!(target: TARGET, "{}", render(msg, fields));
        }
    }

    fn warn(&self, msg: &str, fields: Fields<'_>) {
        log::warn!(target: TARGET, "{}", render(msg, fields));
    }

    fn error(&self, msg: &str, fields: Fields<'_>) {
        log::error!(target: TARGET, "{}", render(msg, fields));
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _msg: &str, _fields: Fields<'_>) {}

    fn info(&self, _msg: &str, _fields: Fields<'_>) {}

    fn warn(&self, _msg: &str, _fields: Fields<'_>) {}

    fn error(&self, _msg: &str, _fields: Fields<'_>) {}
}
