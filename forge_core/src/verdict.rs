use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Factor between the time limit and the wall-clock deadline after which a
/// process is killed regardless of its measured cpu time.
pub const REAL_TIME_FACTOR: f64 = 5.0;

/// Classification of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "TL")]
    TimeLimitExceeded,
    #[serde(rename = "RL")]
    RealTimeLimitExceeded,
    #[serde(rename = "ML")]
    MemoryLimitExceeded,
    #[serde(rename = "RE")]
    RuntimeError,
    #[serde(rename = "VF")]
    ValidationFailed,
    #[serde(rename = "CF")]
    CheckFailed,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "PE")]
    PresentationError,
}

impl Verdict {
    pub const ALL: [Verdict; 9] = [
        Verdict::Ok,
        Verdict::TimeLimitExceeded,
        Verdict::RealTimeLimitExceeded,
        Verdict::MemoryLimitExceeded,
        Verdict::RuntimeError,
        Verdict::ValidationFailed,
        Verdict::CheckFailed,
        Verdict::WrongAnswer,
        Verdict::PresentationError,
    ];

    /// Short code used in verdict records and descriptors.
    pub fn code(self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::TimeLimitExceeded => "TL",
            Verdict::RealTimeLimitExceeded => "RL",
            Verdict::MemoryLimitExceeded => "ML",
            Verdict::RuntimeError => "RE",
            Verdict::ValidationFailed => "VF",
            Verdict::CheckFailed => "CF",
            Verdict::WrongAnswer => "WA",
            Verdict::PresentationError => "PE",
        }
    }

    pub fn is_ok(self) -> bool {
        self == Verdict::Ok
    }

    /// Exit code protocol shared by checkers and interactors:
    /// 0 is OK, 1 is WA, 2 is PE, anything else (a signal included) is CF.
    pub fn from_checker_exit(code: Option<i32>) -> Self {
        match code {
            Some(0) => Verdict::Ok,
            Some(1) => Verdict::WrongAnswer,
            Some(2) => Verdict::PresentationError,
            _ => Verdict::CheckFailed,
        }
    }

    /// Exit code protocol of validators: 0 is OK, anything else is VF.
    pub fn from_validator_exit(code: Option<i32>) -> Self {
        match code {
            Some(0) => Verdict::Ok,
            _ => Verdict::ValidationFailed,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

impl FromStr for Verdict {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Verdict::ALL
            .iter()
            .copied()
            .find(|v| v.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Argument(format!("unknown verdict `{}`", s)))
    }
}

/// Time and memory limits of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Seconds of cpu time.
    #[serde(default = "default_time_limit")]
    pub time_limit: f64,
    /// MiB of peak resident memory.
    #[serde(default = "default_memory_limit")]
    pub memory_limit: f64,
}

fn default_time_limit() -> f64 {
    1.0
}

fn default_memory_limit() -> f64 {
    256.0
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            time_limit: default_time_limit(),
            memory_limit: default_memory_limit(),
        }
    }
}

impl LimitConfig {
    pub fn new(time_limit: f64, memory_limit: f64) -> Self {
        Self {
            time_limit,
            memory_limit,
        }
    }

    /// Hard wall-clock deadline in seconds.
    pub fn real_time_limit(&self) -> f64 {
        self.time_limit * REAL_TIME_FACTOR
    }
}

/// Result of running one program on one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub verdict: Verdict,
    /// Seconds of cpu time.
    pub time: f64,
    /// MiB of peak memory.
    pub memory: f64,
    #[serde(default)]
    pub comment: String,
}

impl ExecutionOutcome {
    pub fn new(verdict: Verdict, time: f64, memory: f64) -> Self {
        Self {
            verdict,
            time,
            memory,
            comment: String::new(),
        }
    }
}
