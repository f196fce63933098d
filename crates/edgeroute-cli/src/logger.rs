//! Console logger for the CLI.

use std::io::Write;

use edgeroute_spec::Logger;

/// Standard stream the user channel is printed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stream {
    #[default]
    Stdout,
    Stderr,
}

/// Prints user messages byte for byte and sends system messages to
/// `tracing`.
///
/// Commands that print a JSON document on stdout use [`ConsoleLogger::stderr`]
/// so function output does not interleave with the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsoleLogger {
    stream: Stream,
}

impl ConsoleLogger {
    /// Logger printing user messages to stdout.
    pub fn stdout() -> Self {
        Self {
            stream: Stream::Stdout,
        }
    }

    /// Logger printing user messages to stderr.
    pub fn stderr() -> Self {
        Self {
            stream: Stream::Stderr,
        }
    }

    /// Picks the stream for a command that may print JSON on stdout.
    pub fn for_output(json_output: bool) -> Self {
        if json_output {
            Self::stderr()
        } else {
            Self::stdout()
        }
    }

    /// Returns the stream user messages go to.
    pub fn stream(&self) -> Stream {
        self.stream
    }
}

impl Logger for ConsoleLogger {
    fn system(&self, message: &str) {
        tracing::debug!(target: "edgeroute::system", "{}", message);
    }

    fn user(&self, message: &str) {
        let result = match self.stream {
            Stream::Stdout => write_verbatim(&mut std::io::stdout().lock(), message),
            Stream::Stderr => write_verbatim(&mut std::io::stderr().lock(), message),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to print function output: {}", e);
        }
    }
}

fn write_verbatim(out: &mut impl Write, message: &str) -> std::io::Result<()> {
    out.write_all(message.as_bytes())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_output_is_written_unchanged() {
        let mut out = Vec::new();
        write_verbatim(&mut out, "  partial line").unwrap();
        write_verbatim(&mut out, "\x1b[32mgreen\x1b[0m\n\n").unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "  partial line\x1b[32mgreen\x1b[0m\n\n"
        );
    }

    #[test]
    fn test_json_output_moves_user_channel_to_stderr() {
        assert_eq!(ConsoleLogger::for_output(true).stream(), Stream::Stderr);
        assert_eq!(ConsoleLogger::for_output(false).stream(), Stream::Stdout);
        assert_eq!(ConsoleLogger::default(), ConsoleLogger::stdout());
    }
}
