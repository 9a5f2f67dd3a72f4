//! Process exit status of the resync binary
//!
//! Scripts rely on these values; changing one is a breaking change.

use resync_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    /// Anything unclassified, including a run that left failed items
    GeneralError = 1,
    /// Bad arguments, malformed locator or unsupported topology
    UsageError = 2,
    /// Network or listing failure
    NetworkError = 3,
    AuthError = 4,
    /// Session, alias, object or file not found
    NotFound = 5,
    /// A session record exists but cannot be used
    CorruptSession = 6,
    /// Ctrl-C; the session was kept for resume
    Interrupted = 130,
}

const ALL: [ExitCode; 8] = [
    ExitCode::Success,
    ExitCode::GeneralError,
    ExitCode::UsageError,
    ExitCode::NetworkError,
    ExitCode::AuthError,
    ExitCode::NotFound,
    ExitCode::CorruptSession,
    ExitCode::Interrupted,
];

impl ExitCode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i32) -> Option<Self> {
        ALL.into_iter().find(|c| i32::from(c.code()) == code)
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        Self::from_code(err.exit_code()).unwrap_or(Self::GeneralError)
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}
