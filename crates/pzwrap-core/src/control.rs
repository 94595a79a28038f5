//! Control-command vocabulary for the server console.
//!
//! A handful of words typed at the wrapper's terminal are intercepted before
//! they reach the server. Matching trims whitespace and ignores case, but the
//! forwarded payload keeps the operator's original text.

/// Word that asks the wrapper to stop the server and launch a fresh one.
pub const RESTART_COMMAND: &str = "restart";

/// Word that asks the server to shut down for good.
pub const QUIT_COMMAND: &str = "quit";

/// How a line of terminal input is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Stop the running server and relaunch it after it exits.
    Restart,
    /// Stop the running server without relaunching.
    Quit,
    /// Ordinary console input for the server.
    Passthrough,
    /// A termination request is in progress; nothing is forwarded.
    Suppressed,
}

impl Classification {
    /// Whether the input relay stops after handling this line.
    pub const fn ends_relay(self) -> bool {
        !matches!(self, Self::Passthrough)
    }
}

/// Result of classifying one line: what it is and what to send to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interception {
    pub classification: Classification,
    /// Exact bytes to write to the server's stdin, newline included.
    pub payload: Option<String>,
}

/// Classify one line of terminal input.
///
/// `line` is the raw text without its line terminator. Once `killed` is set
/// every line is [`Classification::Suppressed`], control words included.
pub fn classify(line: &str, killed: bool) -> Interception {
    if killed {
        return Interception {
            classification: Classification::Suppressed,
            payload: None,
        };
    }

    let normalized = line.trim();
    if normalized.eq_ignore_ascii_case(RESTART_COMMAND) {
        // The server only understands `quit`; the relaunch is ours.
        Interception {
            classification: Classification::Restart,
            payload: Some(format!("{QUIT_COMMAND}\n")),
        }
    } else if normalized.eq_ignore_ascii_case(QUIT_COMMAND) {
        Interception {
            classification: Classification::Quit,
            payload: Some(format!("{line}\n")),
        }
    } else {
        Interception {
            classification: Classification::Passthrough,
            payload: Some(format!("{line}\n")),
        }
    }
}
