//! Run outcomes and exit codes.

/// How a `run` or `edit` invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every step succeeded
    Passed,
    /// A step failed; the message is what was logged
    Failed(String),
    /// The user interrupted the run, teardown completed
    Interrupted,
    /// The user interrupted teardown twice and it was abandoned
    ForcedShutdown,
}

impl Outcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Passed => 0,
            Outcome::Failed(_) => 1,
            Outcome::Interrupted => 2,
            Outcome::ForcedShutdown => 1,
        }
    }

    /// A failed teardown turns a pass into a failure; other outcomes stand
    pub fn with_teardown_failure(self, message: impl Into<String>) -> Self {
        match self {
            Outcome::Passed => Outcome::Failed(message.into()),
            other => other,
        }
    }
}
