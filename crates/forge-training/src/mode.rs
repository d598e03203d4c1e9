use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Execution mode of the estimator.
///
/// `Warmup` is the mode before any run has been started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Train,
    Eval,
    Test,
    #[default]
    Warmup,
}

impl Mode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Eval => "eval",
            Self::Test => "test",
            Self::Warmup => "warmup",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "train" => Ok(Self::Train),
            "eval" => Ok(Self::Eval),
            "test" => Ok(Self::Test),
            "warmup" => Ok(Self::Warmup),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}
