use std::fmt;

/// What a failed step means for the run as a whole.
#[derive(Debug)]
pub enum Failure {
    /// The current trial is lost, the loop carries on.
    Recoverable(anyhow::Error),
    /// Nothing sensible can follow, stop the run.
    Fatal(anyhow::Error),
}

impl Failure {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Failure::Fatal(_))
    }

    pub fn into_inner(self) -> anyhow::Error {
        match self {
            Failure::Recoverable(e) | Failure::Fatal(e) => e,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Recoverable(e) => write!(f, "recoverable: {:#}", e),
            Failure::Fatal(e) => write!(f, "fatal: {:#}", e),
        }
    }
}

pub trait FailureExt<T> {
    fn recoverable(self) -> Result<T, Failure>;
    fn fatal(self) -> Result<T, Failure>;
}

impl<T, E: Into<anyhow::Error>> FailureExt<T> for Result<T, E> {
    fn recoverable(self) -> Result<T, Failure> {
        self.map_err(|e| Failure::Recoverable(e.into()))
    }

    fn fatal(self) -> Result<T, Failure> {
        self.map_err(|e| Failure::Fatal(e.into()))
    }
}
