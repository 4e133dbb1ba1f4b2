//! Injected interaction ports.
//!
//! The storage recovery flow needs a yes/no answer from the user. It is
//! modeled as a port so the flow stays testable without a terminal and so
//! cancellation is a first-class value instead of a raised interrupt.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;

use crate::error::{Error, Result};

/// A single yes/no question put to the user.
#[async_trait]
pub trait ConfirmationService: Send + Sync {
    /// Ask `question`, returning the answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Aborted`] when the user cancels (EOF, interrupt).
    async fn confirm(&self, question: &str) -> Result<bool>;
}

/// Terminal-backed confirmation: prints the question to stdout and reads
/// one line from stdin. Empty input defaults to "no".
pub struct TerminalConfirmation;

#[async_trait]
impl ConfirmationService for TerminalConfirmation {
    async fn confirm(&self, question: &str) -> Result<bool> {
        let question = question.to_string();
        tokio::task::spawn_blocking(move || {
            let mut stdout = io::stdout();
            write!(stdout, "{question} [y/N]: ")?;
            stdout.flush()?;

            let mut line = String::new();
            let read = io::stdin().lock().read_line(&mut line)?;
            if read == 0 {
                // EOF: the user closed the stream instead of answering.
                return Err(Error::Aborted);
            }
            Ok(matches!(
                line.trim().to_ascii_lowercase().as_str(),
                "y" | "yes"
            ))
        })
        .await
        .map_err(|_| Error::Aborted)?
    }
}

/// Scripted confirmation used across the crate's tests: answers every
/// question the same way and counts how often it was asked.
#[cfg(test)]
pub struct ScriptedConfirmation {
    pub answer: Option<bool>,
    pub asked: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ScriptedConfirmation {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: Some(answer),
            asked: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn aborting() -> Self {
        Self {
            answer: None,
            asked: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ConfirmationService for ScriptedConfirmation {
    async fn confirm(&self, _question: &str) -> Result<bool> {
        self.asked
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.answer.ok_or(Error::Aborted)
    }
}
