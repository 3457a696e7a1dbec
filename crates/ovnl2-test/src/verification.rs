//! Verification helpers for testing the plugin
//!
//! Assertion helpers over the commands captured by a [`FakeRunner`]

use crate::{FakeRunner, Invocation};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected an invocation of '{program}' containing '{needle}'")]
    NotInvoked { program: String, needle: String },

    #[error("Unexpected invocation of '{program}': {command_line}")]
    UnexpectedInvocation {
        program: String,
        command_line: String,
    },

    #[error("Expected '{first}' before '{second}' for '{program}'")]
    OutOfOrder {
        program: String,
        first: String,
        second: String,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Command verification helper
pub struct CommandVerifier {
    invocations: Vec<Invocation>,
}

impl CommandVerifier {
    /// Snapshot the invocations captured so far
    pub fn new(runner: &FakeRunner) -> Self {
        Self {
            invocations: runner.invocations(),
        }
    }

    fn position(&self, program: &str, needle: &str) -> Option<usize> {
        self.invocations
            .iter()
            .position(|i| i.program == program && i.contains(needle))
    }

    /// Verify that `program` was invoked with arguments containing `needle`
    pub fn assert_invoked(&self, program: &str, needle: &str) -> VerifyResult<&Invocation> {
        self.position(program, needle)
            .map(|idx| &self.invocations[idx])
            .ok_or_else(|| VerificationError::NotInvoked {
                program: program.to_string(),
                needle: needle.to_string(),
            })
    }

    /// Verify that `program` was never invoked
    pub fn assert_not_invoked(&self, program: &str) -> VerifyResult<()> {
        match self.invocations.iter().find(|i| i.program == program) {
            Some(i) => Err(VerificationError::UnexpectedInvocation {
                program: program.to_string(),
                command_line: i.command_line(),
            }),
            None => Ok(()),
        }
    }

    /// Verify that the first matching invocation for `first` precedes the
    /// first matching invocation for `second`
    pub fn assert_order(&self, program: &str, first: &str, second: &str) -> VerifyResult<()> {
        let out_of_order = || VerificationError::OutOfOrder {
            program: program.to_string(),
            first: first.to_string(),
            second: second.to_string(),
        };
        let a = self.position(program, first).ok_or_else(out_of_order)?;
        let b = self.position(program, second).ok_or_else(out_of_order)?;
        if a < b {
            Ok(())
        } else {
            Err(out_of_order())
        }
    }

    /// Number of invocations of `program`
    pub fn count(&self, program: &str) -> usize {
        self.invocations.iter().filter(|i| i.program == program).count()
    }
}
