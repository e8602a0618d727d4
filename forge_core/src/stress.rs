use std::{fs, io::ErrorKind};

use log::{debug, info};

use crate::{
    error::{Error, Result},
    expand::Expansion,
    problem::Test,
    session::Session,
    solution::Solution,
    verdict::Verdict,
};

/// What stress testing found out about one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct StressEntry {
    pub solution: String,
    /// Distinct verdicts in the order they were first seen.
    pub verdicts: Vec<Verdict>,
    /// The generator command on which the candidate broke its tag.
    pub counterexample: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StressReport {
    /// Number of generated tests actually run.
    pub runs: usize,
    pub entries: Vec<StressEntry>,
}

impl StressReport {
    pub fn failed(&self) -> impl Iterator<Item = &StressEntry> {
        self.entries.iter().filter(|e| e.counterexample.is_some())
    }
}

/// Judge `candidates` on every test produced by the expanded `command`,
/// each against the main solution's output.
///
/// A candidate is dropped on its first verdict incompatible with its tag,
/// and the loop ends early once no candidate is left.
pub fn stress(session: &Session, command: &str, candidates: Vec<Solution>) -> Result<StressReport> {
    let commands = Expansion::new(command)?;
    let scratch = tempfile::TempDir::new()?;
    let main = session.main();

    let mut entries: Vec<StressEntry> = candidates
        .iter()
        .map(|c| StressEntry {
            solution: c.identifier().into(),
            verdicts: Vec::new(),
            counterexample: None,
        })
        .collect();
    let mut alive: Vec<(usize, Solution)> = candidates.into_iter().enumerate().collect();
    let mut runs = 0;

    for generate in commands {
        if alive.is_empty() {
            debug!("no candidates left");
            break;
        }
        runs += 1;
        let test = Test::scratch(scratch.path(), generate.clone());
        match fs::remove_file(test.input_path()) {
            Err(err) if err.kind() != ErrorKind::NotFound => return Err(err.into()),
            _ => {}
        }
        session.materialize(&test)?;

        let reference = session.judge(main, &test)?;
        if !main.tag.check_one(reference.verdict) {
            return Err(Error::configuration(format!(
                "main solution `{}` gets {} on `{}`: {}",
                main.identifier(),
                reference.verdict,
                generate,
                reference.comment
            )));
        }

        let mut survivors = Vec::with_capacity(alive.len());
        for (index, candidate) in alive {
            let outcome = session.judge(&candidate, &test)?;
            let entry = &mut entries[index];
            if !entry.verdicts.contains(&outcome.verdict) {
                entry.verdicts.push(outcome.verdict);
            }
            if candidate.tag.check_one(outcome.verdict) {
                survivors.push((index, candidate));
            } else {
                info!(
                    "`{}` gets {} on `{}`",
                    candidate.identifier(),
                    outcome.verdict,
                    generate
                );
                entry.counterexample = Some(generate.clone());
            }
        }
        alive = survivors;
    }

    Ok(StressReport { runs, entries })
}
