//! Interactive operator prompts
//!
//! Generic over the reader and writer so the session loop can be driven from
//! tests. `Ok(None)` / `Ok(false)` means the input was closed.

use std::io::{self, BufRead, Write};

use asr_loadgen_core::{Error, RunParams};

/// Ask for iteration count and concurrency until both are in range
pub fn read_run_params<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<RunParams>> {
    let Some(iterations) = read_bounded(
        input,
        output,
        "Uploading iterations: ",
        RunParams::check_iterations,
    )?
    else {
        return Ok(None);
    };

    let Some(concurrency) = read_bounded(
        input,
        output,
        "Uploading concurrency: ",
        RunParams::check_concurrency,
    )?
    else {
        return Ok(None);
    };

    RunParams::new(iterations, concurrency)
        .map(Some)
        .map_err(io::Error::other)
}

/// Ask whether to run another round
pub fn read_another_round<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<bool> {
    loop {
        writeln!(output, "Another test? (y/n): ")?;
        output.flush()?;

        let Some(answer) = read_line(input)? else {
            return Ok(false);
        };

        match answer.trim().to_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => continue,
        }
    }
}

fn read_bounded<R, W, F>(input: &mut R, output: &mut W, label: &str, check: F) -> io::Result<Option<u32>>
where
    R: BufRead,
    W: Write,
    F: Fn(u32) -> asr_loadgen_core::Result<u32>,
{
    loop {
        writeln!(output, "{}", label)?;
        output.flush()?;

        let Some(line) = read_line(input)? else {
            return Ok(None);
        };

        // Non-numeric input counts as out of range
        let value = line.trim().parse::<u32>().unwrap_or(0);

        match check(value) {
            Ok(value) => return Ok(Some(value)),
            Err(Error::Validation(message)) => writeln!(output, "{}", message)?,
            Err(e) => writeln!(output, "{}", e)?,
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
