use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    process::Stdio,
};

use log::debug;

use crate::{
    error::Result,
    problem::FileName,
    supervisor::{Measurement, RunRequest, Supervisor},
    verdict::{ExecutionOutcome, LimitConfig, Verdict},
};

/// How a file reaches the program.
#[derive(Debug)]
enum Binding {
    /// Piped through a standard stream.
    Stream(PathBuf),
    /// Copied in to (or out of) the working directory under `name`.
    Named { name: String, path: PathBuf },
}

impl Binding {
    fn new(name: &FileName, path: PathBuf) -> Self {
        match name {
            FileName::Stdio => Binding::Stream(path),
            FileName::File(name) => Binding::Named {
                name: name.clone(),
                path,
            },
        }
    }

    fn is_named(&self) -> bool {
        matches!(self, Binding::Named { .. })
    }
}

/// One run of one program under limits.
#[derive(Debug)]
pub struct Invocation {
    command: Vec<String>,
    limits: LimitConfig,
    temp_cwd: bool,
    cwd: Option<PathBuf>,
    stdin: Option<Binding>,
    stdout: Option<Binding>,
    streams: Option<(Stdio, Stdio)>,
}

impl Invocation {
    pub fn new(command: Vec<String>, limits: LimitConfig) -> Self {
        Self {
            command,
            limits,
            temp_cwd: false,
            cwd: None,
            stdin: None,
            stdout: None,
            streams: None,
        }
    }

    /// Run inside a fresh directory which is removed afterwards.
    pub fn with_temp_cwd(mut self) -> Self {
        self.temp_cwd = true;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_stdin(mut self, name: &FileName, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(Binding::new(name, path.into()));
        self
    }

    pub fn with_stdout(mut self, name: &FileName, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(Binding::new(name, path.into()));
        self
    }

    /// Attach already opened streams, e.g. pipe ends shared with an interactor.
    pub fn with_streams(mut self, stdin: Stdio, stdout: Stdio) -> Self {
        self.streams = Some((stdin, stdout));
        self
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn limits(&self) -> &LimitConfig {
        &self.limits
    }

    pub fn run(self, supervisor: &dyn Supervisor) -> Result<ExecutionOutcome> {
        let has_named = self.stdin.as_ref().map_or(false, Binding::is_named)
            || self.stdout.as_ref().map_or(false, Binding::is_named);

        // dropped on every return path below, taking the directory with it
        let temp_dir = if self.temp_cwd || (has_named && self.cwd.is_none()) {
            Some(tempfile::TempDir::new()?)
        } else {
            None
        };
        let cwd = match &temp_dir {
            Some(dir) => Some(dir.path().to_path_buf()),
            None => self.cwd.clone(),
        };

        let mut request = RunRequest::new(self.command, self.limits);
        request.cwd = cwd.clone();

        if let Some((stdin, stdout)) = self.streams {
            request.stdin = stdin;
            request.stdout = stdout;
        }

        match &self.stdin {
            Some(Binding::Stream(path)) => request.stdin = File::open(path)?.into(),
            Some(Binding::Named { name, path }) => {
                if let Some(dir) = &cwd {
                    fs::copy(path, dir.join(name))?;
                }
                request.stdin = Stdio::null();
            }
            None => {}
        }
        match &self.stdout {
            Some(Binding::Stream(path)) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                request.stdout = File::create(path)?.into();
            }
            Some(Binding::Named { .. }) => request.stdout = Stdio::null(),
            None => {}
        }

        let measured = supervisor.supervise(request);

        // the named output is collected whatever happened to the run
        let collected = match (&self.stdout, &cwd) {
            (Some(Binding::Named { name, path }), Some(dir)) => collect(&dir.join(name), path),
            _ => Ok(()),
        };

        let measured = measured?;
        collected?;

        let verdict = classify(&measured, &self.limits);
        Ok(ExecutionOutcome::new(
            verdict,
            measured.cpu_time,
            measured.peak_memory,
        ))
    }
}

fn collect(produced: &Path, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if produced.exists() {
        fs::copy(produced, path)?;
    } else {
        debug!("{} was not produced, leaving empty output", produced.display());
        File::create(path)?;
    }
    Ok(())
}

/// Map a measurement onto a verdict. The real-time kill wins, then abnormal
/// termination, then measured time, then measured memory.
pub fn classify(measured: &Measurement, limits: &LimitConfig) -> Verdict {
    if measured.killed {
        Verdict::RealTimeLimitExceeded
    } else if measured.signal == Some(libc::SIGXCPU) {
        Verdict::TimeLimitExceeded
    } else if !measured.success() {
        Verdict::RuntimeError
    } else if measured.cpu_time > limits.time_limit {
        Verdict::TimeLimitExceeded
    } else if measured.peak_memory > limits.memory_limit {
        Verdict::MemoryLimitExceeded
    } else {
        Verdict::Ok
    }
}
