use std::io::{self, BufRead, IsTerminal, Write};

use tracing::{debug, warn};

/// The interactive surface the store reports to: a blocking yes/no gate in
/// front of destructive operations, and a user-visible alert for failures
/// that must not stay silent.
pub trait Host {
    fn confirm(&mut self, message: &str) -> bool;
    fn alert(&mut self, message: &str);
}

/// Prompts on stderr and reads the answer from stdin.
#[derive(Debug, Clone)]
pub struct TerminalHost {
    assume_yes: bool,
}

impl TerminalHost {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Host for TerminalHost {
    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            debug!(message, "confirmation assumed");
            return true;
        }

        let stdin = io::stdin();
        if !stdin.is_terminal() {
            warn!(message, "stdin is not a terminal; declining confirmation");
            return false;
        }

        let mut err = io::stderr().lock();
        let _ = write!(err, "{message} [y/N] ");
        let _ = err.flush();

        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).is_err() {
            return false;
        }
        parse_answer(&answer)
    }

    fn alert(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer(" YES "));
        assert!(!parse_answer("\n"));
        assert!(!parse_answer("nope"));
    }

    #[test]
    fn assume_yes_skips_the_prompt() {
        let mut host = TerminalHost::new(true);
        assert!(host.confirm("Are you sure?"));
    }
}
