//! Collaborators that speak the verdict protocol: checkers, validators,
//! generators and interactors.

pub mod checker;
pub mod generator;
pub mod interactive;
pub mod validator;

use std::process::Output;

pub use self::{
    checker::CheckerVerdict,
    interactive::interact,
    validator::{Rejection, ValidatorVerdict},
};

/// Trimmed stderr of a finished collaborator, used as the verdict comment.
fn comment_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
