use std::{fs::File, path::Path, process::Stdio};

use log::debug;

use super::comment_of;
use crate::{
    error::Result,
    program::{prepare, Executable},
    verdict::Verdict,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorVerdict {
    pub verdict: Verdict,
    pub comment: String,
}

/// The first validator of a stack that refused an input.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub validator: String,
    pub verdict: ValidatorVerdict,
}

/// Feed `input` to the validator on stdin, with its path as the argument.
pub fn validate(validator: &dyn Executable, input: &Path) -> Result<ValidatorVerdict> {
    let result = prepare(validator)?
        .arg(input)
        .stdin(File::open(input)?)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()?;

    let verdict = Verdict::from_validator_exit(result.status.code());
    debug!(
        "validator `{}` on {}: {}",
        validator.identifier(),
        input.display(),
        verdict
    );
    Ok(ValidatorVerdict {
        verdict,
        comment: comment_of(&result),
    })
}

/// Run every validator in order, stopping at the first rejection.
pub fn validate_all(validators: &[&dyn Executable], input: &Path) -> Result<Option<Rejection>> {
    for validator in validators {
        let verdict = validate(*validator, input)?;
        if !verdict.verdict.is_ok() {
            return Ok(Some(Rejection {
                validator: validator.identifier().into(),
                verdict,
            }));
        }
    }
    Ok(None)
}
