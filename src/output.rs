use std::io::{self, Write};

use serde::Serialize;

use crate::app::{CancellationOutcome, CancellationResult, SubmissionOutcome, ValidationResult};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_submission(result: &SubmissionOutcome) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_cancellation(result: &CancellationOutcome) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_cancellations(result: &CancellationResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_validation(result: &ValidationResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
