//! Message channel handed to modules

use std::fmt;
use std::sync::Arc;

/// Severity of a module message
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageLevel::Debug => "debug",
            MessageLevel::Info => "info",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Sink modules report through
pub type MessageSink = Arc<dyn Fn(MessageLevel, &str) + Send + Sync>;

/// Sink forwarding to the `log` facade
pub fn log_sink() -> MessageSink {
    Arc::new(|level: MessageLevel, text: &str| match level {
        MessageLevel::Debug => log::debug!("module: {}", text),
        MessageLevel::Info => log::info!("module: {}", text),
        MessageLevel::Warning => log::warn!("module: {}", text),
        MessageLevel::Error => log::error!("module: {}", text),
    })
}
