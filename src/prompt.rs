//! Operator confirmation for actions flagged `confirm = true`.
use anyhow::{Context as _, Result};
use std::io::{BufRead as _, IsTerminal as _, Write as _};

/// Asks the operator a yes/no question.
pub trait Prompt: Send + Sync + std::fmt::Debug {
    /// Return `true` if the operator agreed.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Whether a typed answer counts as consent. Anything but `y`/`yes` declines.
#[must_use]
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// [`Prompt`] reading from the controlling terminal.
///
/// Declines without asking when stdin is not a terminal, so piped or
/// scheduled runs never block.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            tracing::debug!("stdin is not a terminal; declining: {question}");
            return Ok(false);
        }

        let mut stderr = std::io::stderr().lock();
        write!(stderr, "  {question} [y/N] ").context("writing prompt")?;
        stderr.flush().context("flushing prompt")?;

        let mut answer = String::new();
        stdin
            .lock()
            .read_line(&mut answer)
            .context("reading confirmation")?;
        Ok(is_yes(&answer))
    }
}

/// [`Prompt`] that always gives the same answer (`--yes`, tests).
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub bool);

impl Prompt for FixedPrompt {
    fn confirm(&self, _question: &str) -> Result<bool> {
        Ok(self.0)
    }
}
