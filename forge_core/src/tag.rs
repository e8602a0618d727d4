use std::{collections::HashSet, fmt};

use crate::{
    error::{Error, Result},
    verdict::Verdict,
};

/// Expected behaviour of a solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolutionTag {
    /// The reference solution. Must be OK everywhere.
    Main,
    /// Must be OK everywhere.
    Correct,
    /// May get OK or any of the listed verdicts, and must fail somewhere.
    Incorrect(HashSet<Verdict>),
}

impl Default for SolutionTag {
    fn default() -> Self {
        SolutionTag::Main
    }
}

impl SolutionTag {
    pub fn from_descriptor(tag: &str, verdicts: &[Verdict]) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "main" => Ok(SolutionTag::Main),
            "correct" => Ok(SolutionTag::Correct),
            "incorrect" => {
                if verdicts.is_empty() {
                    return Err(Error::Argument(
                        "incorrect tag needs at least one verdict".into(),
                    ));
                }
                Ok(SolutionTag::Incorrect(verdicts.iter().copied().collect()))
            }
            _ => Err(Error::Argument(format!("unknown solution tag `{}`", tag))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SolutionTag::Main => "main",
            SolutionTag::Correct => "correct",
            SolutionTag::Incorrect(_) => "incorrect",
        }
    }

    /// Verdicts allowed by the tag, sorted for display and storage.
    pub fn verdicts(&self) -> Vec<Verdict> {
        match self {
            SolutionTag::Incorrect(allowed) => {
                let mut v: Vec<Verdict> = allowed.iter().copied().collect();
                v.sort_by_key(|v| v.code());
                v
            }
            _ => Vec::new(),
        }
    }

    /// Whether a single verdict is compatible with the tag.
    pub fn check_one(&self, verdict: Verdict) -> bool {
        match self {
            SolutionTag::Main | SolutionTag::Correct => verdict.is_ok(),
            SolutionTag::Incorrect(allowed) => verdict.is_ok() || allowed.contains(&verdict),
        }
    }

    /// Whether the verdicts of a whole test set are compatible with the tag.
    /// An incorrect solution must fail at least once, unless OK is itself
    /// among its listed verdicts.
    pub fn check_all(&self, verdicts: &[Verdict]) -> bool {
        if !verdicts.iter().all(|v| self.check_one(*v)) {
            return false;
        }
        match self {
            SolutionTag::Incorrect(allowed) if !allowed.contains(&Verdict::Ok) => {
                verdicts.iter().any(|v| !v.is_ok())
            }
            _ => true,
        }
    }
}

impl fmt::Display for SolutionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionTag::Incorrect(_) => {
                let codes: Vec<&str> = self.verdicts().iter().map(|v| v.code()).collect();
                write!(f, "incorrect({})", codes.join(","))
            }
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Verdict::*;

    fn incorrect(verdicts: &[Verdict]) -> SolutionTag {
        SolutionTag::from_descriptor("incorrect", verdicts).unwrap()
    }

    #[test]
    fn main_and_correct_need_ok() {
        for tag in &[SolutionTag::Main, SolutionTag::Correct] {
            assert!(tag.check_one(Ok));
            assert!(!tag.check_one(WrongAnswer));
            assert!(tag.check_all(&[Ok, Ok]));
            assert!(tag.check_all(&[]));
            assert!(!tag.check_all(&[Ok, TimeLimitExceeded]));
        }
    }

    #[test]
    fn incorrect_must_fail_somewhere() {
        let tag = incorrect(&[TimeLimitExceeded, WrongAnswer]);
        assert!(tag.check_one(Ok));
        assert!(tag.check_one(WrongAnswer));
        assert!(!tag.check_one(RuntimeError));

        assert!(tag.check_all(&[Ok, TimeLimitExceeded]));
        assert!(!tag.check_all(&[Ok, Ok]));
        assert!(!tag.check_all(&[]));
        assert!(!tag.check_all(&[WrongAnswer, RuntimeError]));
    }

    #[test]
    fn incorrect_listing_ok_may_pass_everything() {
        let tag = incorrect(&[Ok, TimeLimitExceeded]);
        assert!(tag.check_all(&[Ok, Ok]));
        assert!(tag.check_all(&[]));
    }

    #[test]
    fn descriptor_parsing() {
        assert_eq!(
            SolutionTag::from_descriptor("Main", &[]).unwrap(),
            SolutionTag::Main
        );
        assert!(SolutionTag::from_descriptor("incorrect", &[]).is_err());
        assert!(SolutionTag::from_descriptor("wrong", &[]).is_err());
        assert_eq!(
            incorrect(&[WrongAnswer, CheckFailed]).to_string(),
            "incorrect(CF,WA)"
        );
    }
}
