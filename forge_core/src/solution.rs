use crate::{program::Program, tag::SolutionTag};

/// A solution program with the verdicts it is expected to get.
#[derive(Debug, Clone)]
pub struct Solution {
    pub program: Program,
    pub tag: SolutionTag,
}

impl Solution {
    pub fn new(program: Program, tag: SolutionTag) -> Self {
        Self { program, tag }
    }

    pub fn identifier(&self) -> &str {
        &self.program.identifier
    }

    pub fn is_main(&self) -> bool {
        self.tag == SolutionTag::Main
    }
}
