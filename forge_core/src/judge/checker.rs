use std::{path::Path, process::Stdio};

use log::debug;

use super::comment_of;
use crate::{
    error::Result,
    program::{prepare, Executable},
    verdict::Verdict,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CheckerVerdict {
    pub verdict: Verdict,
    pub comment: String,
}

/// Run `checker input output answer` and map its exit code.
pub fn judge(
    checker: &dyn Executable,
    input: &Path,
    output: &Path,
    answer: &Path,
) -> Result<CheckerVerdict> {
    let result = prepare(checker)?
        .arg(input)
        .arg(output)
        .arg(answer)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()?;

    let verdict = Verdict::from_checker_exit(result.status.code());
    debug!(
        "checker `{}` on {}: {}",
        checker.identifier(),
        output.display(),
        verdict
    );
    Ok(CheckerVerdict {
        verdict,
        comment: comment_of(&result),
    })
}
