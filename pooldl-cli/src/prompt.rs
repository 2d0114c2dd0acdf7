//! Interactive fallback when no input is given on the command line.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};

const PROMPT: &str = "Please enter either:\n- Pool URL / ID\n- Path to downloaded pool\n\n> ";

/// Ask for a pool until a non-empty line is entered.
///
/// End of input before any answer is an error.
pub fn ask_for_input(mut input: impl BufRead, mut out: impl Write) -> Result<String> {
    loop {
        out.write_all(PROMPT.as_bytes()).context("failed to write prompt")?;
        out.flush().context("failed to write prompt")?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("failed to read input")?;
        if read == 0 {
            bail!("no pool given");
        }
        let answer = line.trim();
        if !answer.is_empty() {
            writeln!(out).context("failed to write prompt")?;
            return Ok(answer.to_string());
        }
    }
}
