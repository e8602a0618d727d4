use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::{
    cache::{self, Dependency},
    error::{Error, Result},
    invoke::Invocation,
    judge::{checker, generator, interactive, validator, Rejection},
    problem::{Problem, Test},
    program::{Executable, Program, Role},
    solution::Solution,
    supervisor::Supervisor,
    verdict::{ExecutionOutcome, Verdict},
};

/// Verdicts of one solution over the whole test set.
#[derive(Debug, Clone, PartialEq)]
pub struct TagReport {
    pub solution: String,
    pub verdicts: Vec<Verdict>,
    pub valid: bool,
}

/// Everything needed to judge solutions of one problem.
pub struct Session<'a> {
    problem: &'a Problem,
    supervisor: &'a dyn Supervisor,
    main: Solution,
    checker: Program,
    interactor: Option<Program>,
    validators: Vec<Program>,
}

fn compile_failure(what: String) -> impl FnOnce(Error) -> Error {
    move |err| match err {
        Error::Compile { msg, .. } => {
            Error::Configuration(format!("{} failed to compile: {}", what, msg))
        }
        other => other,
    }
}

impl<'a> Session<'a> {
    pub fn open(problem: &'a Problem, supervisor: &'a dyn Supervisor) -> Result<Self> {
        let config = &problem.config;
        let checker = match &config.active_checker {
            Some(id) => problem.source(Role::Checker, id)?,
            None => return Err(Error::configuration("active checker is not set")),
        };

        let interactor = if config.interactive {
            if !config.input_file.is_stdio() || !config.output_file.is_stdio() {
                return Err(Error::configuration(
                    "interactive problems must use standard io",
                ));
            }
            match &config.active_interactor {
                Some(id) => Some(problem.source(Role::Interactor, id)?),
                None => return Err(Error::configuration("active interactor is not set")),
            }
        } else {
            None
        };

        let validators = config
            .active_validators
            .iter()
            .map(|id| problem.source(Role::Validator, id))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            problem,
            supervisor,
            main: problem.main_solution()?,
            checker,
            interactor,
            validators,
        })
    }

    pub fn problem(&self) -> &Problem {
        self.problem
    }

    pub fn main(&self) -> &Solution {
        &self.main
    }

    pub fn checker(&self) -> &Program {
        &self.checker
    }

    fn compile_checker(&self) -> Result<bool> {
        self.checker
            .ensure_compiled()
            .map_err(compile_failure(format!("checker `{}`", self.checker.identifier)))
    }

    fn compile_interactor(&self, interactor: &Program) -> Result<bool> {
        interactor
            .ensure_compiled()
            .map_err(compile_failure(format!("interactor `{}`", interactor.identifier)))
    }

    fn compile_solution(&self, solution: &Solution) -> Result<bool> {
        solution
            .program
            .ensure_compiled()
            .map_err(compile_failure(format!("solution `{}`", solution.identifier())))
    }

    fn compile_validators(&self) -> Result<()> {
        for v in &self.validators {
            v.ensure_compiled()
                .map_err(compile_failure(format!("validator `{}`", v.identifier)))?;
        }
        Ok(())
    }

    fn is_main(&self, solution: &Solution) -> bool {
        solution.identifier() == self.main.identifier()
    }

    /// Create the input of a generated test. Problem tests are regenerated
    /// only when the generator or the test descriptor changed since, scratch
    /// tests only when their input is missing.
    pub fn materialize(&self, test: &Test) -> Result<()> {
        let command = match &test.generate {
            Some(command) => command,
            None => return Ok(()),
        };
        let input = test.input_path();
        if test.is_scratch() && input.exists() {
            return Ok(());
        }
        let words = shlex::split(command).ok_or_else(|| Error::Command(command.clone()))?;
        let (identifier, args) = words
            .split_first()
            .ok_or_else(|| Error::Command(command.clone()))?;

        let generator = self.problem.source(Role::Generator, identifier)?;
        generator
            .ensure_compiled()
            .map_err(compile_failure(format!("generator `{}`", identifier)))?;

        if !test.is_scratch() {
            let descriptor = test.descriptor_path();
            let mut deps = vec![Dependency::probe(generator.artifact())];
            if let Some(descriptor) = &descriptor {
                deps.push(Dependency::probe(descriptor));
            }
            if !cache::is_stale(Dependency::probe(&input).modified, &deps) {
                debug!("test {} is up to date", test.name());
                return Ok(());
            }
        }
        generator::generate(&generator, args, &input)
    }

    /// Check a test input against every active validator.
    pub fn validate(&self, test: &Test) -> Result<Option<Rejection>> {
        self.materialize(test)?;
        self.compile_validators()?;
        let stack: Vec<&dyn Executable> = self
            .validators
            .iter()
            .map(|v| v as &dyn Executable)
            .collect();
        validator::validate_all(&stack, &test.input_path())
    }

    /// Run a solution on a test without consulting the checker. The output
    /// lands at the test's output path for that solution.
    pub fn invoke(&self, solution: &Solution, test: &Test) -> Result<ExecutionOutcome> {
        self.compile_solution(solution)?;
        self.materialize(test)?;

        let config = &self.problem.config;
        let input = test.input_path();
        let output = test.output_path(solution.identifier());
        let invocation =
            Invocation::new(solution.program.command()?, config.limits).with_temp_cwd();

        match &self.interactor {
            Some(interactor) => {
                self.compile_interactor(interactor)?;
                interactive::interact(interactor, &input, &output, invocation, self.supervisor)
            }
            None => invocation
                .with_stdin(&config.input_file, input)
                .with_stdout(&config.output_file, output)
                .run(self.supervisor),
        }
    }

    fn dependencies(&self, solution: &Solution, test: &Test) -> Vec<PathBuf> {
        let mut paths = vec![
            test.input_path(),
            test.output_path(self.main.identifier()),
            solution.program.source.clone(),
            self.checker.artifact().to_path_buf(),
        ];
        if let Some(descriptor) = &solution.program.descriptor {
            paths.push(descriptor.clone());
        }
        if let Some(interactor) = &self.interactor {
            paths.push(interactor.artifact().to_path_buf());
        }
        paths
    }

    fn cached(&self, solution: &Solution, test: &Test) -> Result<Option<ExecutionOutcome>> {
        let path = match test.verdict_path(solution.identifier()) {
            Some(path) => path,
            None => return Ok(None),
        };
        let record = match cache::load_record(&path)? {
            Some(record) => record,
            None => return Ok(None),
        };
        let paths = self.dependencies(solution, test);
        let deps: Vec<Dependency> = paths.iter().map(|p| Dependency::probe(p)).collect();
        if cache::is_stale(Some(record.judged_at), &deps) {
            Ok(None)
        } else {
            Ok(Some(record.outcome))
        }
    }

    /// Whether judging `solution` on `test` would run anything, including
    /// the main solution producing the answer.
    pub fn needs_judge(&self, solution: &Solution, test: &Test) -> Result<bool> {
        let answer_stale = !test.is_scratch()
            && !self.is_main(solution)
            && self.cached(&self.main, test)?.is_none();
        if answer_stale {
            return Ok(true);
        }
        Ok(self.cached(solution, test)?.is_none())
    }

    /// Verdict of a solution on a test, reusing the recorded one when
    /// nothing it depends on changed.
    ///
    /// For problem tests the main solution is judged first, so that its
    /// output is there to serve as the answer. Scratch tests are never
    /// cached and the caller judges the main solution on them.
    pub fn judge(&self, solution: &Solution, test: &Test) -> Result<ExecutionOutcome> {
        self.compile_checker()?;
        if let Some(interactor) = &self.interactor {
            self.compile_interactor(interactor)?;
        }
        self.compile_solution(solution)?;
        self.materialize(test)?;

        if !test.is_scratch() && !self.is_main(solution) {
            self.judge(&self.main, test)?;
        }

        if let Some(outcome) = self.cached(solution, test)? {
            debug!(
                "{} on test {}: {} (cached)",
                solution.identifier(),
                test.name(),
                outcome.verdict
            );
            return Ok(outcome);
        }

        let mut outcome = self.invoke(solution, test)?;
        if outcome.verdict.is_ok() {
            let checked = checker::judge(
                &self.checker,
                &test.input_path(),
                &test.output_path(solution.identifier()),
                &test.output_path(self.main.identifier()),
            )?;
            outcome.verdict = checked.verdict;
            if !checked.comment.is_empty() || !outcome.verdict.is_ok() {
                outcome.comment = checked.comment;
            }
        }
        info!(
            "{} on test {}: {} in {:.3}s, {:.1}MiB",
            solution.identifier(),
            test.name(),
            outcome.verdict,
            outcome.time,
            outcome.memory
        );

        if let Some(path) = test.verdict_path(solution.identifier()) {
            let paths = self.dependencies(solution, test);
            let dependencies: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
            cache::store_record(&path, &outcome, &dependencies)?;
        }
        Ok(outcome)
    }

    /// Prepare the problem: compile every active program, produce and
    /// validate every test, and make sure the main solution passes all of
    /// them.
    pub fn build(&self) -> Result<Vec<Test>> {
        self.compile_checker()?;
        if let Some(interactor) = &self.interactor {
            self.compile_interactor(interactor)?;
        }
        self.compile_solution(&self.main)?;
        self.compile_validators()?;

        let tests = self.problem.tests()?;
        for (position, test) in tests.iter().enumerate() {
            if test.index != position + 1 {
                return Err(Error::configuration(format!(
                    "tests are not numbered contiguously: expected {:02}, found {}",
                    position + 1,
                    test.name()
                )));
            }
        }

        for test in &tests {
            if let Some(rejection) = self.validate(test)? {
                return Err(Error::configuration(format!(
                    "validator `{}` rejects test {}: {}",
                    rejection.validator,
                    test.name(),
                    rejection.verdict.comment
                )));
            }
        }

        for test in &tests {
            let outcome = self.judge(&self.main, test)?;
            if !self.main.tag.check_one(outcome.verdict) {
                return Err(Error::configuration(format!(
                    "main solution `{}` gets {} on test {}: {}",
                    self.main.identifier(),
                    outcome.verdict,
                    test.name(),
                    outcome.comment
                )));
            }
        }

        info!("problem {} is built", self.problem.name());
        Ok(tests)
    }

    /// Build, then judge every solution on every test and check its tag.
    pub fn verify(&self) -> Result<Vec<TagReport>> {
        let tests = self.build()?;
        for lint in lint_tests(&tests) {
            warn!("{}", lint);
        }
        if self.validators.is_empty() {
            warn!("no active validators");
        } else if self.validators.iter().all(Program::is_standard) {
            warn!("no custom validators, only standard ones");
        }

        let mut reports = Vec::new();
        for solution in self.problem.solutions()? {
            let verdicts = tests
                .iter()
                .map(|test| self.judge(&solution, test).map(|o| o.verdict))
                .collect::<Result<Vec<_>>>()?;
            let valid = solution.tag.check_all(&verdicts);
            if valid {
                info!("solution `{}` matches its tag {}", solution.identifier(), solution.tag);
            } else {
                warn!(
                    "solution `{}` does not match its tag {}",
                    solution.identifier(),
                    solution.tag
                );
            }
            reports.push(TagReport {
                solution: solution.identifier().into(),
                verdicts,
                valid,
            });
        }
        Ok(reports)
    }
}

/// Non-fatal remarks about a test set.
pub fn lint_tests(tests: &[Test]) -> Vec<String> {
    let mut lints = Vec::new();
    if tests.is_empty() {
        lints.push("no tests".to_string());
        return lints;
    }
    if !tests[0].sample {
        lints.push("the first test is not a sample".to_string());
    }
    let samples_end = tests.iter().take_while(|t| t.sample).count();
    if let Some(late) = tests[samples_end..].iter().find(|t| t.sample) {
        lints.push(format!("sample test {} follows a non-sample test", late.name()));
    }
    lints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::TestDescriptor;
    use std::path::Path;

    fn tests(samples: &[bool]) -> Vec<Test> {
        samples
            .iter()
            .enumerate()
            .map(|(i, sample)| {
                Test::new(
                    Path::new("/p"),
                    i + 1,
                    TestDescriptor {
                        sample: *sample,
                        generate: None,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn lints() {
        assert_eq!(lint_tests(&[]), vec!["no tests"]);
        assert!(lint_tests(&tests(&[true, true, false])).is_empty());
        assert_eq!(
            lint_tests(&tests(&[false, true])),
            vec![
                "the first test is not a sample",
                "sample test 02 follows a non-sample test"
            ]
        );
    }
}
