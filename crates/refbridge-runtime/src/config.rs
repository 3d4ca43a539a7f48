//! Session configuration

use std::str::FromStr;

use refbridge_stdlib::{ConsoleTarget, BUILTIN_MODULES};

/// Environment variable selecting the reply stream
pub const REPLIES_ENV: &str = "REFBRIDGE_REPLIES";

/// Default inbound line length limit (16 MiB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Standard stream carrying replies and notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyStream {
    /// Replies on stdout
    Stdout,
    /// Replies on stderr, leaving stdout to the console
    #[default]
    Stderr,
}

impl FromStr for ReplyStream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(ReplyStream::Stdout),
            "stderr" => Ok(ReplyStream::Stderr),
            other => Err(format!("unknown reply stream '{}' (expected stdout or stderr)", other)),
        }
    }
}

/// Options for creating a bridge session
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Stream carrying replies and notifications
    pub reply_stream: ReplyStream,

    /// Console target; `None` derives it from `reply_stream`
    pub console_target: Option<ConsoleTarget>,

    /// Built-in modules `require` can load
    pub modules: Vec<String>,

    /// Inbound lines longer than this are skipped
    pub max_line_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            reply_stream: ReplyStream::default(),
            console_target: None,
            modules: BUILTIN_MODULES.iter().map(|m| m.to_string()).collect(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with the environment
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();
        if let Ok(stream) = std::env::var(REPLIES_ENV) {
            config.reply_stream = stream.parse()?;
        }
        Ok(config)
    }

    /// Set the reply stream
    pub fn with_reply_stream(mut self, stream: ReplyStream) -> Self {
        self.reply_stream = stream;
        self
    }

    /// Override the console target
    pub fn with_console_target(mut self, target: ConsoleTarget) -> Self {
        self.console_target = Some(target);
        self
    }

    /// Restrict the loadable built-in modules
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    /// Set the inbound line length limit
    pub fn with_max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    /// Effective console target.
    ///
    /// Console output never shares a stream with replies: when replies use
    /// stdout, everything the console prints goes to stderr.
    pub fn console(&self) -> ConsoleTarget {
        if let Some(target) = &self.console_target {
            return target.clone();
        }
        match self.reply_stream {
            ReplyStream::Stdout => ConsoleTarget::Stderr,
            ReplyStream::Stderr => ConsoleTarget::Split,
        }
    }
}
