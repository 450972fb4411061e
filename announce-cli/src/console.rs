//! Operator-facing input and output
//!
//! Progress and results go to the console output; diagnostics go through
//! `tracing` to stderr.

use std::io::{self, BufRead, Write};

const INVALID_ANSWER: &str = "Invalid input. Please type 'y' (Yes) or 'n' (No).";

/// Console bound to an input and an output stream
pub struct Console<R, W> {
    input: R,
    output: W,
    /// Answer every confirmation with "yes" without reading input
    assume_yes: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.output, "{}", text.as_ref())
    }

    /// Ask a yes/no question until the answer is `y` or `n`
    ///
    /// Answers are trimmed and case-insensitive. End of input counts as `n`.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        loop {
            write!(self.output, "{}", question)?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                writeln!(self.output)?;
                return Ok(false);
            }

            match answer.trim().to_lowercase().as_str() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => writeln!(self.output, "{}", INVALID_ANSWER)?,
            }
        }
    }

    /// Give back the output stream, for inspecting what was written
    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(input: &str, assume_yes: bool) -> Console<&[u8], Vec<u8>> {
        Console::new(input.as_bytes(), Vec::new(), assume_yes)
    }

    fn output(console: Console<&[u8], Vec<u8>>) -> String {
        String::from_utf8(console.into_output()).unwrap()
    }

    #[test]
    fn test_yes_and_no() {
        let mut c = console(" Y \n", false);
        assert!(c.confirm("Proceed? ").unwrap());

        let mut c = console("n\n", false);
        assert!(!c.confirm("Proceed? ").unwrap());
    }

    #[test]
    fn test_invalid_answers_reprompt() {
        let mut c = console("maybe\nyes\n\ny\n", false);
        assert!(c.confirm("Proceed? ").unwrap());

        let text = output(c);
        assert_eq!(text.matches("Proceed? ").count(), 4);
        assert_eq!(text.matches(INVALID_ANSWER).count(), 3);
    }

    #[test]
    fn test_end_of_input_is_no() {
        let mut c = console("", false);
        assert!(!c.confirm("Proceed? ").unwrap());
    }

    #[test]
    fn test_assume_yes_reads_nothing() {
        let mut c = console("n\n", true);
        assert!(c.confirm("Proceed? ").unwrap());
        assert!(output(c).is_empty());
    }
}
