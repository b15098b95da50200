//! Interactive rename confirmation.

use std::io::{BufRead, Write};

use tidemark_core::error::OracleError;
use tidemark_core::rename::{RenameCandidate, RenameOracle};

/// Asks about each rename candidate on `output` and reads the answer from
/// `input`. An empty answer means yes; end of input is an error.
#[derive(Debug)]
pub struct PromptOracle<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptOracle<R, W> {
    /// Creates a prompt oracle.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> RenameOracle for PromptOracle<R, W> {
    fn confirm_rename(&mut self, candidate: &RenameCandidate) -> Result<bool, OracleError> {
        loop {
            write!(
                self.output,
                "Rename {}.{} to {}.{}? [Y/n] ",
                candidate.table, candidate.old, candidate.table, candidate.new
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "no answer to rename prompt",
                )));
            }

            match line.trim().to_ascii_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn candidate() -> RenameCandidate {
        RenameCandidate::new("user", "nick", "nickname")
    }

    #[test]
    fn test_answers() {
        for (input, expected) in [("y\n", true), ("YES\n", true), ("\n", true), ("n\n", false), ("no\n", false)] {
            let mut oracle = PromptOracle::new(Cursor::new(input), Vec::new());
            assert_eq!(oracle.confirm_rename(&candidate()).unwrap(), expected, "{input:?}");
        }
    }

    #[test]
    fn test_reprompts_on_unclear_answer() {
        let mut output = Vec::new();
        let mut oracle = PromptOracle::new(Cursor::new("maybe\nn\n"), &mut output);
        assert!(!oracle.confirm_rename(&candidate()).unwrap());

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Rename user.nick to user.nickname? [Y/n] ").count(), 2);
        assert!(text.contains("Please answer y or n."));
    }

    #[test]
    fn test_end_of_input_is_an_error() {
        let mut oracle = PromptOracle::new(Cursor::new(""), Vec::new());
        assert!(oracle.confirm_rename(&candidate()).is_err());
    }
}
