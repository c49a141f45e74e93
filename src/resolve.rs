use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::Path;

use thiserror::Error;

/// A question put to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt<'a> {
    /// Answered with exactly `Y` or `N`.
    Confirm { question: &'a str },
    /// Answered with one of `options`.
    Choose { subject: &'a str, options: &'a [String] },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no answer left for prompt: {0}")]
    Exhausted(String),
    #[error("gave up after {attempts} invalid answers to: {prompt}")]
    TooManyAttempts { prompt: String, attempts: u32 },
    #[error("failed to read operator input")]
    Io(#[from] io::Error),
}

/// Source of operator decisions. Validation and re-asking live in
/// [`confirm`] and [`choose`], so implementations only hand back raw answers.
pub trait Resolver: Send {
    fn propose(&mut self, prompt: &Prompt<'_>) -> Result<String, ResolveError>;

    /// Upper bound on invalid answers before giving up. `None` re-asks forever.
    fn max_attempts(&self) -> Option<u32> {
        None
    }
}

/// Ask a Y/N question until the answer is exactly `Y` or `N`.
pub fn confirm(resolver: &mut dyn Resolver, question: &str) -> Result<bool, ResolveError> {
    let prompt = Prompt::Confirm { question };
    let mut attempts = 0;
    loop {
        match resolver.propose(&prompt)?.as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            other => tracing::debug!("rejected answer {other:?}, expected Y or N"),
        }
        attempts += 1;
        check_attempts(resolver, question, attempts)?;
    }
}

/// Ask for one of `options` until a listed one is given.
pub fn choose<'o>(
    resolver: &mut dyn Resolver,
    subject: &str,
    options: &'o [String],
) -> Result<&'o str, ResolveError> {
    let prompt = Prompt::Choose { subject, options };
    let mut attempts = 0;
    loop {
        let answer = resolver.propose(&prompt)?;
        if let Some(option) = options.iter().find(|o| **o == answer) {
            return Ok(option.as_str());
        }
        tracing::debug!("rejected answer {answer:?} for {subject}");
        attempts += 1;
        check_attempts(resolver, subject, attempts)?;
    }
}

fn check_attempts(resolver: &dyn Resolver, prompt: &str, attempts: u32) -> Result<(), ResolveError> {
    match resolver.max_attempts() {
        Some(max) if attempts >= max => Err(ResolveError::TooManyAttempts {
            prompt: prompt.to_string(),
            attempts,
        }),
        _ => Ok(()),
    }
}

/// Reads answers from stdin, one line per prompt.
pub struct TerminalResolver {
    max_attempts: Option<u32>,
}

impl TerminalResolver {
    pub fn new(max_attempts: Option<u32>) -> Self {
        Self { max_attempts }
    }
}

impl Resolver for TerminalResolver {
    fn propose(&mut self, prompt: &Prompt<'_>) -> Result<String, ResolveError> {
        let mut stdout = io::stdout().lock();
        match prompt {
            Prompt::Confirm { question } => write!(stdout, "{question} [Y/N]: ")?,
            Prompt::Choose { subject, options } => {
                writeln!(stdout, "Select {subject}:")?;
                for option in options.iter() {
                    writeln!(stdout, "  {option}")?;
                }
                write!(stdout, "> ")?;
            }
        }
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(ResolveError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed",
            )));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

/// Replays pre-recorded answers in order, e.g. for unattended runs.
#[derive(Debug, Default)]
pub struct ScriptedResolver {
    answers: VecDeque<String>,
    asked: usize,
}

impl ScriptedResolver {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: 0,
        }
    }

    /// One answer per line of `path`.
    pub fn from_file(path: &Path) -> Result<Self, ResolveError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::new(contents.lines()))
    }

    /// Number of prompts answered so far.
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl Resolver for ScriptedResolver {
    fn propose(&mut self, prompt: &Prompt<'_>) -> Result<String, ResolveError> {
        let answer = self.answers.pop_front().ok_or_else(|| {
            ResolveError::Exhausted(match prompt {
                Prompt::Confirm { question } => question.to_string(),
                Prompt::Choose { subject, .. } => subject.to_string(),
            })
        })?;
        self.asked += 1;
        Ok(answer)
    }
}
