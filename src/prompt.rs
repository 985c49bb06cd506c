//! Operator prompts for session parameters.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};

use crate::config::{DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES};

/// Message shown when the entered duration is unusable.
pub const INVALID_DURATION: &str = "Invalid duration. Using default 60 minutes.";

/// Outcome of parsing a duration answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationChoice {
    pub minutes: u64,
    /// The input was not a positive whole number of minutes.
    pub invalid: bool,
}

/// Parse a duration in minutes, falling back to the default.
///
/// Empty input silently selects the default; anything else that is not a
/// positive integer up to [`MAX_DURATION_MINUTES`] selects it with `invalid`
/// set.
pub fn parse_duration_minutes(input: &str) -> DurationChoice {
    let input = input.trim();
    if input.is_empty() {
        return DurationChoice {
            minutes: DEFAULT_DURATION_MINUTES,
            invalid: false,
        };
    }

    match input.parse::<u64>() {
        Ok(minutes) if (1..=MAX_DURATION_MINUTES).contains(&minutes) => DurationChoice {
            minutes,
            invalid: false,
        },
        _ => DurationChoice {
            minutes: DEFAULT_DURATION_MINUTES,
            invalid: true,
        },
    }
}

/// Ask for the monitoring location until a non-empty answer is given.
pub fn ask_location<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<String> {
    loop {
        write!(out, "Enter monitoring location: ")?;
        out.flush()?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("Failed to read location")?;
        if read == 0 {
            bail!("No monitoring location given");
        }

        let location = line.trim();
        if !location.is_empty() {
            return Ok(location.to_string());
        }
        writeln!(out, "Location must not be empty.")?;
    }
}

/// Ask for the session duration in minutes.
pub fn ask_duration<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<u64> {
    write!(
        out,
        "Enter monitoring duration in minutes (default {}): ",
        DEFAULT_DURATION_MINUTES
    )?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read duration")?;

    let choice = parse_duration_minutes(&line);
    if choice.invalid {
        writeln!(out, "{}", INVALID_DURATION)?;
    }
    Ok(choice.minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_duration_minutes() {
        assert_eq!(parse_duration_minutes("15").minutes, 15);
        assert_eq!(parse_duration_minutes(" 5 \n").minutes, 5);
        assert_eq!(parse_duration_minutes(""), DurationChoice { minutes: 60, invalid: false });
        assert_eq!(parse_duration_minutes("0"), DurationChoice { minutes: 60, invalid: true });
        assert_eq!(parse_duration_minutes("-3"), DurationChoice { minutes: 60, invalid: true });
        assert_eq!(parse_duration_minutes("ten"), DurationChoice { minutes: 60, invalid: true });
        assert_eq!(parse_duration_minutes("1.5").minutes, 60);
    }

    #[test]
    fn test_out_of_range_duration_falls_back() {
        let max = MAX_DURATION_MINUTES.to_string();
        assert_eq!(
            parse_duration_minutes(&max),
            DurationChoice { minutes: MAX_DURATION_MINUTES, invalid: false }
        );

        let over = (MAX_DURATION_MINUTES + 1).to_string();
        assert_eq!(parse_duration_minutes(&over), DurationChoice { minutes: 60, invalid: true });
        assert_eq!(
            parse_duration_minutes("18446744073709551615"),
            DurationChoice { minutes: 60, invalid: true }
        );
        assert_eq!(
            parse_duration_minutes("99999999999999999999999"),
            DurationChoice { minutes: 60, invalid: true }
        );
    }

    #[test]
    fn test_ask_location_retries_blank() {
        let mut input = Cursor::new("\n  \nBoiler room\n");
        let mut out = Vec::new();
        let location = ask_location(&mut input, &mut out).unwrap();
        assert_eq!(location, "Boiler room");

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Enter monitoring location: ").count(), 3);
    }

    #[test]
    fn test_ask_location_eof() {
        let mut input = Cursor::new("");
        assert!(ask_location(&mut input, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_ask_duration_reports_fallback() {
        let mut out = Vec::new();
        let minutes = ask_duration(&mut Cursor::new("abc\n"), &mut out).unwrap();
        assert_eq!(minutes, 60);
        assert!(String::from_utf8(out).unwrap().contains(INVALID_DURATION));

        let mut out = Vec::new();
        assert_eq!(ask_duration(&mut Cursor::new("\n"), &mut out).unwrap(), 60);
        assert!(!String::from_utf8(out).unwrap().contains(INVALID_DURATION));
    }
}
