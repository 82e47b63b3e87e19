//! User interaction for the interactive menu and workflows.
//!
//! Everything user-facing goes through a [`Console`] so the workflows can be driven from a
//! script in tests. Diagnostics go to `tracing` instead.

use eyre::Context;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// A line-oriented terminal.
pub trait Console {
    /// Shows `message` without a trailing newline and reads one line of input.
    ///
    /// The line terminator is stripped. Returns `None` once input is exhausted.
    fn prompt(&mut self, message: &str) -> eyre::Result<Option<String>>;

    /// Shows one line of output.
    fn say(&mut self, line: &str);
}

/// The process' stdin and stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn prompt(&mut self, message: &str) -> eyre::Result<Option<String>> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{message}").context("write prompt")?;
        stdout.flush().context("flush stdout")?;
        drop(stdout);

        let mut line = String::new();
        let n = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read from stdin")?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(strip_line_ending(line)))
    }

    fn say(&mut self, line: &str) {
        println!("{line}");
    }
}

fn strip_line_ending(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

/// A console that replays canned input and records everything shown.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    input: VecDeque<String>,
    transcript: Vec<String>,
    prompts: usize,
}

impl ScriptedConsole {
    pub fn new<I, S>(input: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: input.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
            prompts: 0,
        }
    }

    /// Every prompt and line shown so far, in order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// How many times input was asked for.
    pub fn prompts(&self) -> usize {
        self.prompts
    }

    /// Whether any shown line contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }

    /// Input lines that were never consumed.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

impl Console for ScriptedConsole {
    fn prompt(&mut self, message: &str) -> eyre::Result<Option<String>> {
        self.prompts += 1;
        self.transcript.push(message.to_string());
        Ok(self.input.pop_front())
    }

    fn say(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }
}

/// Asks for confirmation, which is given only if the user types exactly `phrase`.
///
/// Case, surrounding whitespace and end of input all count as a refusal.
pub fn confirm(console: &mut impl Console, prompt: &str, phrase: &str) -> eyre::Result<bool> {
    let answer = console.prompt(prompt)?;
    Ok(answer.as_deref() == Some(phrase))
}

/// Why a selection could not be honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidSelection {
    /// A number, but not one of the offered ones.
    OutOfRange,
    /// Not a number at all.
    NotANumber,
}

impl std::fmt::Display for InvalidSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange => f.write_str("Invalid choice"),
            Self::NotANumber => f.write_str("Invalid input"),
        }
    }
}

/// The user's answer to a numbered list of options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based index of the chosen option.
    Pick(usize),
    Skip,
    Invalid(InvalidSelection),
}

impl Selection {
    /// Interprets `input` against a list of `options` entries numbered from 1.
    ///
    /// `s` (either case) skips.
    pub fn parse(input: &str, options: usize) -> Self {
        let input = input.trim();
        if input.eq_ignore_ascii_case("s") {
            return Self::Skip;
        }
        match input.parse::<i64>() {
            Ok(n) if n >= 1 && (n as u64) <= options as u64 => Self::Pick(n as usize - 1),
            Ok(_) => Self::Invalid(InvalidSelection::OutOfRange),
            // Too many digits for an i64 is still a number, just not an offered one.
            Err(_) if is_integer(input) => Self::Invalid(InvalidSelection::OutOfRange),
            Err(_) => Self::Invalid(InvalidSelection::NotANumber),
        }
    }
}

fn is_integer(input: &str) -> bool {
    let digits = input.strip_prefix(['+', '-']).unwrap_or(input);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_requires_exact_phrase() {
        for (answer, expected) in [
            ("DELETE ALL", true),
            ("delete all", false),
            ("Delete All", false),
            (" DELETE ALL", false),
            ("", false),
        ] {
            let mut console = ScriptedConsole::new([answer]);
            assert_eq!(
                confirm(&mut console, "Type 'DELETE ALL': ", "DELETE ALL").unwrap(),
                expected,
                "answer {answer:?}"
            );
        }
    }

    #[test]
    fn test_confirm_at_end_of_input_refuses() {
        let mut console = ScriptedConsole::new(Vec::<String>::new());
        assert!(!confirm(&mut console, "Sure? ", "yes").unwrap());
        assert_eq!(console.prompts(), 1);
    }

    #[test]
    fn test_selection_parse() {
        assert_eq!(Selection::parse("1", 5), Selection::Pick(0));
        assert_eq!(Selection::parse(" 5\t", 5), Selection::Pick(4));
        assert_eq!(Selection::parse("s", 5), Selection::Skip);
        assert_eq!(Selection::parse("S", 5), Selection::Skip);
        assert_eq!(
            Selection::parse("6", 5),
            Selection::Invalid(InvalidSelection::OutOfRange)
        );
        assert_eq!(
            Selection::parse("0", 5),
            Selection::Invalid(InvalidSelection::OutOfRange)
        );
        assert_eq!(
            Selection::parse("-2", 5),
            Selection::Invalid(InvalidSelection::OutOfRange)
        );
        assert_eq!(
            Selection::parse("99999999999999999999", 5),
            Selection::Invalid(InvalidSelection::OutOfRange)
        );
        assert_eq!(
            Selection::parse("-99999999999999999999", 5),
            Selection::Invalid(InvalidSelection::OutOfRange)
        );
        assert_eq!(
            Selection::parse("+", 5),
            Selection::Invalid(InvalidSelection::NotANumber)
        );
        assert_eq!(
            Selection::parse("two", 5),
            Selection::Invalid(InvalidSelection::NotANumber)
        );
        assert_eq!(
            Selection::parse("", 5),
            Selection::Invalid(InvalidSelection::NotANumber)
        );
    }

    #[test]
    fn test_invalid_selection_messages() {
        assert_eq!(InvalidSelection::OutOfRange.to_string(), "Invalid choice");
        assert_eq!(InvalidSelection::NotANumber.to_string(), "Invalid input");
    }

    #[test]
    fn test_strip_line_ending() {
        assert_eq!(strip_line_ending("abc\r\n".to_string()), "abc");
        assert_eq!(strip_line_ending("abc\n".to_string()), "abc");
        assert_eq!(strip_line_ending(" abc ".to_string()), " abc ");
    }
}
