use std::{fs, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use forge_core::{
    error::Result,
    expand::expand_generator_command,
    stress::stress,
    suite, CellSupervisor, Config, ExecutionOutcome, Problem, Role, Session, Solution,
};
use log::{error, info};

#[derive(Parser)]
#[clap(
    version = "0.1.0",
    name = "Forge",
    author = "Kanari <iovo7c@gmail.com>",
    about = "Prepares and judges competitive programming problems."
)]
struct Opts {
    #[clap(short, long, default_value = ".", help = "problem directory")]
    problem: PathBuf,
    #[clap(short, long, help = "tool configuration file")]
    config: Option<PathBuf>,
    #[clap(short, long, help = "print debug logs")]
    verbose: bool,
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    #[clap(about = "Compile active programs, produce tests and check the main solution")]
    Build,
    #[clap(about = "Build, then check every solution against its tag")]
    Verify,
    #[clap(about = "Judge solutions on tests")]
    Invoke(InvokeConfig),
    #[clap(about = "Search for a test breaking the tag of some solutions")]
    Stress(StressConfig),
    #[clap(about = "Print the commands a generator command expands to")]
    Expand(ExpandConfig),
    #[clap(about = "Print the test suite script, or apply an edited one")]
    Tests(TestsConfig),
    #[clap(about = "Write descriptors for sources that have none")]
    Discover,
}

#[derive(Args, Debug)]
struct InvokeConfig {
    #[clap(short, long, help = "test indices, all by default")]
    tests: Vec<usize>,
    #[clap(short, long, help = "solution identifiers, all by default")]
    solutions: Vec<String>,
}

#[derive(Args, Debug)]
struct StressConfig {
    #[clap(help = "generator command, ranges like [1..100] allowed")]
    command: String,
    #[clap(short, long, help = "candidates, every non-main solution by default")]
    solutions: Vec<String>,
}

#[derive(Args, Debug)]
struct ExpandConfig {
    #[clap(help = "generator command")]
    command: String,
}

#[derive(Args, Debug)]
struct TestsConfig {
    #[clap(long, help = "script to apply")]
    apply: Option<PathBuf>,
}

fn main() {
    let opts: Opts = Opts::parse();

    let level = if opts.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(opts) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    }
}

/// Returns whether every checked tag held.
fn run(opts: Opts) -> Result<bool> {
    let Opts {
        problem: root,
        config,
        subcmd,
        ..
    } = opts;
    let config = match config {
        Some(path) => Config::from_file(&path)?,
        None => Config::builtin()?,
    };

    let load = || Problem::load(&root, &config);

    match subcmd {
        SubCommand::Expand(expand) => {
            for command in expand_generator_command(&expand.command)? {
                println!("{}", command);
            }
            Ok(true)
        }
        SubCommand::Tests(tests) => {
            let problem = load()?;
            match tests.apply {
                Some(path) => {
                    let script = fs::read_to_string(&path)?;
                    let planned = suite::parse(&script, problem.root())?;
                    suite::apply(&problem, &planned)?;
                }
                None => print!("{}", suite::render(&problem)?),
            }
            Ok(true)
        }
        SubCommand::Discover => {
            let problem = load()?;
            for role in [
                Role::Checker,
                Role::Interactor,
                Role::Validator,
                Role::Generator,
                Role::Solution,
            ]
            .iter()
            {
                for identifier in problem.discover(*role)? {
                    info!("registered {} `{}`", role.name(), identifier);
                }
            }
            Ok(true)
        }
        SubCommand::Build => {
            let problem = load()?;
            let supervisor = CellSupervisor::locate(config.cell.as_deref())?;
            Session::open(&problem, &supervisor)?.build()?;
            Ok(true)
        }
        SubCommand::Verify => {
            let problem = load()?;
            let supervisor = CellSupervisor::locate(config.cell.as_deref())?;
            let reports = Session::open(&problem, &supervisor)?.verify()?;
            for report in &reports {
                let codes: Vec<&str> = report.verdicts.iter().map(|v| v.code()).collect();
                println!(
                    "{:<20} {:<8} {}",
                    report.solution,
                    if report.valid { "ok" } else { "BAD TAG" },
                    codes.join(" ")
                );
            }
            Ok(reports.iter().all(|r| r.valid))
        }
        SubCommand::Invoke(invoke) => {
            let problem = load()?;
            let supervisor = CellSupervisor::locate(config.cell.as_deref())?;
            let session = Session::open(&problem, &supervisor)?;
            let solutions = select(&problem, &invoke.solutions)?;
            let tests: Vec<_> = problem
                .tests()?
                .into_iter()
                .filter(|t| invoke.tests.is_empty() || invoke.tests.contains(&t.index))
                .collect();

            for solution in &solutions {
                let mut outcomes = Vec::with_capacity(tests.len());
                for test in &tests {
                    outcomes.push((test.name(), session.judge(solution, test)?));
                }
                print_outcomes(solution, &outcomes);
            }
            Ok(true)
        }
        SubCommand::Stress(stress_config) => {
            let problem = load()?;
            let supervisor = CellSupervisor::locate(config.cell.as_deref())?;
            let session = Session::open(&problem, &supervisor)?;
            let candidates: Vec<Solution> = select(&problem, &stress_config.solutions)?
                .into_iter()
                .filter(|s| !s.is_main())
                .collect();

            let report = stress(&session, &stress_config.command, candidates)?;
            println!("{} tests generated", report.runs);
            for entry in &report.entries {
                let codes: Vec<&str> = entry.verdicts.iter().map(|v| v.code()).collect();
                match &entry.counterexample {
                    Some(command) => println!(
                        "{:<20} {:<12} fails on `{}`",
                        entry.solution,
                        codes.join(","),
                        command
                    ),
                    None => println!("{:<20} {:<12} survived", entry.solution, codes.join(",")),
                }
            }
            let passed = report.failed().next().is_none();
            Ok(passed)
        }
    }
}

/// The named solutions, or all of them.
fn select(problem: &Problem, identifiers: &[String]) -> Result<Vec<Solution>> {
    if identifiers.is_empty() {
        problem.solutions()
    } else {
        identifiers.iter().map(|id| problem.solution(id)).collect()
    }
}

fn print_outcomes(solution: &Solution, outcomes: &[(String, ExecutionOutcome)]) {
    println!("{} ({})", solution.identifier(), solution.tag);
    for (test, outcome) in outcomes {
        println!(
            "  {:>4} {:<3} {:>7.3}s {:>8.1}MiB {}",
            test, outcome.verdict, outcome.time, outcome.memory, outcome.comment
        );
    }
}
