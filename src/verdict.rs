//! Verdicts and the status line.
//!
//! Probes follow the Nagios plugin convention: one line on stdout and an
//! exit code of 0 (OK), 1 (WARNING), 2 (CRITICAL) or 3 (UNKNOWN). Nothing
//! here exits; the binary's `main` returns [`Report::emit`].

use std::convert::Infallible;
use std::fmt;
use std::process::ExitCode;
use std::str::FromStr;

/// Service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Verdict {
    /// Parse a state name. Anything but the three known names is `Unknown`.
    pub fn from_state(state: &str) -> Self {
        match state {
            "OK" => Self::Ok,
            "WARNING" => Self::Warning,
            "CRITICAL" => Self::Critical,
            _ => Self::Unknown,
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for Verdict {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_state(s))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verdict and the line to print for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub verdict: Verdict,
    pub message: String,
}

impl Report {
    pub fn new(verdict: Verdict, message: impl Into<String>) -> Self {
        Self {
            verdict,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.verdict.exit_code()
    }

    /// Print the message to stdout and hand back the exit code.
    pub fn emit(self) -> ExitCode {
        tracing::debug!(target: "snmp_probe::verdict", { verdict = %self.verdict }, "reporting");
        println!("{}", self.message);
        ExitCode::from(self.exit_code())
    }
}

/// Report `message` under the named state.
pub fn report(state: &str, message: impl Into<String>) -> Report {
    Report::new(Verdict::from_state(state), message)
}

/// Give up with UNKNOWN: `"{service} UNKNOWN - {message}"`.
pub fn unknown_exit(service: &str, message: impl fmt::Display) -> Report {
    Report::new(
        Verdict::Unknown,
        format!("{} {} - {}", service, Verdict::Unknown, message),
    )
}
