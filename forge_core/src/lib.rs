pub mod cache;
pub mod config;
pub mod error;
pub mod expand;
pub mod invoke;
pub mod judge;
pub mod language;
pub mod problem;
pub mod program;
pub mod session;
pub mod solution;
pub mod standard;
pub mod stress;
pub mod suite;
pub mod supervisor;
pub mod tag;
pub mod verdict;

pub use crate::{
    config::Config,
    error::{Error, Result},
    invoke::Invocation,
    problem::{FileName, Problem, ProblemConfig, Test},
    program::{Executable, Program, Role},
    session::Session,
    solution::Solution,
    supervisor::{CellSupervisor, Measurement, RunRequest, Supervisor},
    tag::SolutionTag,
    verdict::{ExecutionOutcome, LimitConfig, Verdict},
};
