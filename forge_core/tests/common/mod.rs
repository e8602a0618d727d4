#![allow(dead_code)]

use std::{
    cell::Cell,
    fs,
    os::unix::process::ExitStatusExt,
    path::{Path, PathBuf},
    process::Command,
    time::Instant,
};

use forge_core::{
    error::{Error, Result},
    language::Language,
    Config, Measurement, Problem, RunRequest, Supervisor,
};

/// Runs programs directly, without limits, counting every run.
pub struct DirectSupervisor {
    pub runs: Cell<usize>,
    /// Reported instead of the real measurement when set.
    pub fake: Option<Measurement>,
}

impl DirectSupervisor {
    pub fn new() -> Self {
        Self {
            runs: Cell::new(0),
            fake: None,
        }
    }

    pub fn faking(measurement: Measurement) -> Self {
        Self {
            runs: Cell::new(0),
            fake: Some(measurement),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.get()
    }
}

impl Supervisor for DirectSupervisor {
    fn supervise(&self, request: RunRequest) -> Result<Measurement> {
        self.runs.set(self.runs.get() + 1);
        let (program, args) = request
            .command
            .split_first()
            .ok_or_else(|| Error::Argument("empty command".into()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(request.stdin)
            .stdout(request.stdout)
            .stderr(request.stderr);
        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }

        let start = Instant::now();
        let status = command.status()?;
        drop(command);

        if let Some(fake) = &self.fake {
            return Ok(fake.clone());
        }
        Ok(Measurement {
            exit_code: status.code(),
            signal: status.signal(),
            killed: false,
            cpu_time: start.elapsed().as_secs_f64(),
            peak_memory: 1.0,
        })
    }
}

pub fn config() -> Result<Config> {
    let mut sh = Language::new("sh", None, "sh {src}");
    sh.autodetect = vec![".sh".into()];
    Ok(Config::builtin()?.with_language(sh))
}

/// A problem directory that lives as long as the value.
pub struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new(problem_yaml: &str) -> Result<Self> {
        let v = Self {
            dir: tempfile::TempDir::new()?,
        };
        v.write("problem.yaml", problem_yaml)?;
        fs::create_dir_all(v.path().join("tests"))?;
        Ok(v)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.file(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn problem(&self) -> Result<Problem> {
        Problem::load(self.path(), &config()?)
    }
}

pub const DOUBLE_MAIN: &str = "read x\necho $((x * 2))\n";
pub const PLUS_ONE: &str = "read x\necho $((x + 1))\n";
pub const TRIPLE: &str = "read x\necho $((x * 3))\n";
pub const ECHO_GENERATOR: &str = "echo \"$1\"\n";

/// Accepts when the output equals the answer.
pub const SAME_CHECKER: &str = "\
if [ \"$(cat \"$2\")\" = \"$(cat \"$3\")\" ]; then
  exit 0
fi
echo \"expected $(cat \"$3\"), found $(cat \"$2\")\" >&2
exit 1
";

/// Doubling problem: the answer is twice the input.
pub fn doubling() -> Result<Fixture> {
    let fixture = Fixture::new("internal_name: double\nactive_checker: same\n")?;
    fixture.write("checkers/same.sh", SAME_CHECKER)?;
    fixture.write("generators/gen.sh", ECHO_GENERATOR)?;
    fixture.write("solutions/main.sh", DOUBLE_MAIN)?;
    fixture.write("solutions/main.yaml", "tag: main\n")?;
    fixture.write("tests/01", "1\n")?;
    fixture.write("tests/01.yaml", "sample: true\n")?;
    fixture.write("tests/02", "5\n")?;
    fixture.write("tests/03.yaml", "generate: gen 7\n")?;
    Ok(fixture)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
