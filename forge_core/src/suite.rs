//! Editable test suite scripts.
//!
//! Every non-comment line is `<flags> <argument>`. Flags start with `M`
//! (manual input files, the argument is a glob relative to the problem root)
//! or `G` (generator command with ranges), optionally followed by `S`
//! (sample) and `R` (raw: no glob or range expansion).

use std::{collections::BTreeSet, fs, path::Path};

use log::info;

use crate::{
    error::{Error, Result},
    expand::expand_generator_command,
    problem::{test_name, Problem, TestDescriptor},
};

const HEADER: &str = "\
# Tests of problem {problem}
#
# One test per line, except for comments starting with '#'.
#   M <path>     manual input file relative to the problem root, globs allowed
#   G <command>  generator command, ranges like [1..3] or [1,3..9] expanded
# Extra flags after M or G:
#   S  the test is a sample
#   R  do not expand globs or ranges
#
# MS tests/01
# G gen [1..10] 100
";

/// Input of one planned test.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Data(Vec<u8>),
    Generate(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Planned {
    pub sample: bool,
    pub source: Source,
}

fn malformed(line: &str) -> Error {
    Error::Argument(format!("malformed test line `{}`", line))
}

/// Script describing the current test suite of `problem`.
pub fn render(problem: &Problem) -> Result<String> {
    let mut script = HEADER.replace("{problem}", problem.name());
    script.push('\n');
    for test in problem.tests()? {
        let mut line = String::new();
        match &test.generate {
            Some(command) => {
                line.push('G');
                let expanded = expand_generator_command(command).ok();
                if expanded.as_deref() != Some(&[command.clone()][..]) {
                    line.push('R');
                }
            }
            None => line.push('M'),
        }
        if test.sample {
            line.push('S');
        }
        line.push(' ');
        match &test.generate {
            Some(command) => line.push_str(command),
            None => line.push_str(&format!("tests/{}", test_name(test.index))),
        }
        script.push_str(&line);
        script.push('\n');
    }
    Ok(script)
}

/// Parse a script into planned tests. Manual inputs are read right away,
/// so a script may refer to the files it is about to replace.
pub fn parse(script: &str, root: &Path) -> Result<Vec<Planned>> {
    let mut planned = Vec::new();
    for line in script.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (flags, argument) = match line.find(char::is_whitespace) {
            Some(pos) => (&line[..pos], line[pos..].trim()),
            None => return Err(malformed(line)),
        };
        let sample = flags.contains('S');
        let raw = flags.contains('R');

        match flags.chars().next() {
            Some('M') if raw => planned.push(Planned {
                sample,
                source: Source::Data(fs::read(root.join(argument))?),
            }),
            Some('M') => {
                let pattern = root.join(argument);
                let paths = glob::glob(&pattern.to_string_lossy())
                    .map_err(|e| Error::Argument(format!("bad glob `{}`: {}", argument, e)))?;
                let mut files = Vec::new();
                for path in paths {
                    let path = path.map_err(|e| Error::IO(e.into_error()))?;
                    if path.is_file() {
                        files.push(path);
                    }
                }
                files.sort();
                for file in files {
                    planned.push(Planned {
                        sample,
                        source: Source::Data(fs::read(file)?),
                    });
                }
            }
            Some('G') if raw => planned.push(Planned {
                sample,
                source: Source::Generate(argument.into()),
            }),
            Some('G') => {
                for command in expand_generator_command(argument)? {
                    planned.push(Planned {
                        sample,
                        source: Source::Generate(command),
                    });
                }
            }
            _ => return Err(malformed(line)),
        }
    }
    Ok(planned)
}

/// Rewrite the test directory to hold exactly the planned tests.
pub fn apply(problem: &Problem, planned: &[Planned]) -> Result<()> {
    let dir = problem.test_dir();
    fs::create_dir_all(&dir)?;

    let mut stale = BTreeSet::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            stale.insert(entry.file_name().to_string_lossy().to_string());
        }
    }

    for (position, test) in planned.iter().enumerate() {
        let name = test_name(position + 1);
        let descriptor = TestDescriptor {
            sample: test.sample,
            generate: match &test.source {
                Source::Generate(command) => Some(command.clone()),
                Source::Data(_) => None,
            },
        };
        fs::write(
            dir.join(format!("{}.yaml", name)),
            serde_yaml::to_string(&descriptor)?,
        )?;
        stale.remove(&format!("{}.yaml", name));

        if let Source::Data(data) = &test.source {
            fs::write(dir.join(&name), data)?;
            stale.remove(&name);
        }
    }

    for name in stale {
        fs::remove_file(dir.join(name))?;
    }
    info!(
        "problem {} now has {} tests",
        problem.name(),
        planned.len()
    );
    Ok(())
}
