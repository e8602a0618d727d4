use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use log::debug;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    verdict::LimitConfig,
};

/// File name of the time accounting helper binary.
pub const CELL_NAME: &str = "forge_cell";

/// Everything needed to start one supervised process.
#[derive(Debug)]
pub struct RunRequest {
    pub command: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Stdio,
    pub stdout: Stdio,
    pub stderr: Stdio,
    pub limits: LimitConfig,
}

impl RunRequest {
    pub fn new(command: Vec<String>, limits: LimitConfig) -> Self {
        Self {
            command,
            cwd: None,
            stdin: Stdio::null(),
            stdout: Stdio::null(),
            stderr: Stdio::null(),
            limits,
        }
    }
}

/// Resource usage reported for a finished process.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    /// Killed because the wall-clock deadline passed.
    pub killed: bool,
    /// Seconds, user plus system.
    pub cpu_time: f64,
    /// MiB.
    pub peak_memory: f64,
}

impl Measurement {
    pub fn success(&self) -> bool {
        !self.killed && self.signal.is_none() && self.exit_code == Some(0)
    }
}

/// Starts a process, waits for it and measures it.
///
/// The implementation owns the real-time kill: once `limits.real_time_limit()`
/// seconds pass, the process must be terminated and reported as `killed`.
/// The streams of the request are dropped when this returns, which closes
/// any pipe ends handed over by the caller.
pub trait Supervisor {
    fn supervise(&self, request: RunRequest) -> Result<Measurement>;
}

#[derive(Debug, Deserialize)]
struct CellReport {
    exitcode: Option<i32>,
    signal: Option<i32>,
    killed: bool,
    /// ms
    time: u64,
    /// KiB
    memory: u64,
}

impl From<CellReport> for Measurement {
    fn from(report: CellReport) -> Self {
        Self {
            exit_code: report.exitcode,
            signal: report.signal,
            killed: report.killed,
            cpu_time: report.time as f64 / 1000.0,
            peak_memory: report.memory as f64 / 1024.0,
        }
    }
}

/// Supervisor delegating to the `forge_cell` binary.
#[derive(Debug, Clone)]
pub struct CellSupervisor {
    path: PathBuf,
}

impl CellSupervisor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Find the cell: the configured path, then next to the current
    /// executable, then in `PATH`.
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        if let Some(path) = configured {
            if !path.exists() {
                return Err(Error::Environment(format!(
                    "configured cell `{}` does not exist",
                    path.display()
                )));
            }
            return Ok(Self::new(path));
        }

        let sibling = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(CELL_NAME)));
        if let Some(sibling) = sibling {
            if sibling.exists() {
                return Ok(Self::new(sibling));
            }
        }

        which::which(CELL_NAME)
            .map(Self::new)
            .map_err(|_| Error::Environment(format!("missing {}", CELL_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn millis(seconds: f64) -> String {
    ((seconds * 1000.0).ceil() as u64).to_string()
}

impl Supervisor for CellSupervisor {
    fn supervise(&self, request: RunRequest) -> Result<Measurement> {
        let (program, args) = request
            .command
            .split_first()
            .ok_or_else(|| Error::Argument("empty command".into()))?;

        let temp_dir = tempfile::TempDir::new()?;
        let log_path = temp_dir.path().join("report.yaml");
        let limits = request.limits;

        let mut command = Command::new(&self.path);
        command
            .arg("-t")
            .arg(millis(limits.time_limit))
            .arg("-m")
            .arg((limits.memory_limit.ceil() as u64).to_string())
            .arg("-r")
            .arg(millis(limits.real_time_limit()))
            .arg("-o")
            .arg(&log_path)
            .arg(program)
            .arg("--")
            .args(args)
            .stdin(request.stdin)
            .stdout(request.stdout)
            .stderr(request.stderr);
        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }

        debug!("supervising {:?}", request.command);
        let status = command.status()?;
        // the command still holds the parent's copies of redirected pipes
        drop(command);

        let report = fs::read_to_string(&log_path).map_err(|err| {
            Error::Cell(format!(
                "{} exited with {} and left no report: {}",
                self.path.display(),
                status,
                err
            ))
        })?;
        let report: CellReport = serde_yaml::from_str(&report)?;
        Ok(report.into())
    }
}
