//! Numbered merge method menu

use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;
use splitfetch_core::{Chooser, MergeStrategy, MethodStatus};

/// Ask on `output` which of `methods` to use, reading the answer from `input`.
///
/// Entries are numbered from 1 in the order given; `0`, an empty line or end
/// of input cancels. Invalid answers are asked again.
pub fn prompt(
    mut input: impl BufRead,
    mut output: impl Write,
    package: &str,
    methods: &[MethodStatus],
) -> io::Result<Option<MergeStrategy>> {
    writeln!(output)?;
    writeln!(output, "Choose a merge method for {}:", package.bold())?;
    for (i, m) in methods.iter().enumerate() {
        writeln!(
            output,
            "  {}. {} - {} {}",
            i + 1,
            m.strategy.label(),
            m.strategy.description(),
            format!("[{}]", m.status).dark_grey()
        )?;
    }
    writeln!(output, "  0. Cancel")?;

    let mut line = String::new();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        match line.trim() {
            "" | "0" => return Ok(None),
            answer => match answer.parse::<usize>() {
                Ok(n) if (1..=methods.len()).contains(&n) => {
                    return Ok(Some(methods[n - 1].strategy));
                }
                _ => writeln!(output, "Enter a number between 0 and {}", methods.len())?,
            },
        }
    }
}

/// Prompts on the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinChooser;

impl Chooser for StdinChooser {
    fn choose(&self, package: &str, available: &[MethodStatus]) -> Option<MergeStrategy> {
        let stdin = io::stdin();
        match prompt(stdin.lock(), io::stdout().lock(), package, available) {
            Ok(choice) => choice,
            Err(e) => {
                tracing::warn!(error = %e, "Prompt failed");
                None
            }
        }
    }
}
