use std::{
    fs,
    io::Read,
    path::Path,
    process::{Child, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use log::{debug, warn};

use crate::{
    error::Result,
    invoke::Invocation,
    program::{prepare, Executable},
    supervisor::Supervisor,
    verdict::{ExecutionOutcome, Verdict},
};

/// Wait for `child` at most `deadline`, killing it afterwards.
/// `None` means it had to be killed.
fn wait_with_deadline(child: &mut Child, deadline: Duration) -> Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= deadline {
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Run a solution against an interactor.
///
/// The interactor is started first with `input transcript` as arguments.
/// Its stdout becomes the solution's stdin and the solution's stdout feeds
/// its stdin. Once the solution is done, the interactor's own verdict is
/// used only if the solution itself finished OK.
pub fn interact(
    interactor: &dyn Executable,
    input: &Path,
    transcript: &Path,
    invocation: Invocation,
    supervisor: &dyn Supervisor,
) -> Result<ExecutionOutcome> {
    if let Some(parent) = transcript.parent() {
        fs::create_dir_all(parent)?;
    }
    let deadline = Duration::from_secs_f64(invocation.limits().real_time_limit());

    let mut child = prepare(interactor)?
        .arg(input)
        .arg(transcript)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let to_interactor = child.stdin.take().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "failed to open stdin for interactor",
        )
    })?;
    let from_interactor = child.stdout.take().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "failed to open stdout for interactor",
        )
    })?;
    let mut interactor_err = child.stderr.take().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "failed to open stderr for interactor",
        )
    })?;

    let stderr_reader = thread::spawn(move || {
        let mut buf = String::new();
        let _ = interactor_err.read_to_string(&mut buf);
        buf
    });

    // our copies of both pipe ends are closed when the run returns
    let solution = invocation
        .with_streams(Stdio::from(from_interactor), Stdio::from(to_interactor))
        .run(supervisor);

    let outcome = match solution {
        Ok(outcome) => outcome,
        Err(err) => {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stderr_reader.join();
            return Err(err);
        }
    };

    if !outcome.verdict.is_ok() {
        debug!(
            "solution got {}, not consulting interactor `{}`",
            outcome.verdict,
            interactor.identifier()
        );
        let _ = child.kill();
        child.wait()?;
        let _ = stderr_reader.join();
        return Ok(outcome);
    }

    let status = wait_with_deadline(&mut child, deadline)?;
    let comment = stderr_reader.join().unwrap_or_default().trim().to_string();
    let verdict = match status {
        Some(status) => Verdict::from_checker_exit(status.code()),
        None => {
            warn!(
                "interactor `{}` did not finish in {:?}",
                interactor.identifier(),
                deadline
            );
            Verdict::CheckFailed
        }
    };

    Ok(ExecutionOutcome {
        verdict,
        comment,
        ..outcome
    })
}
