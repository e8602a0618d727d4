use std::{
    error::Error,
    ffi::CString,
    fs, io, ptr,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread,
    time::Duration,
};

use clap::{App, Arg, ArgMatches};
use serde::Serialize;

/// Exit code of the child when the program cannot be executed.
const EXEC_FAILED: i32 = 124;

#[derive(Debug, Serialize)]
struct Report {
    exitcode: Option<i32>,
    signal: Option<i32>,
    /// Killed by the watchdog after the real time limit.
    killed: bool,
    /// user + system, ms
    time: u64,
    /// peak resident set, KiB
    memory: u64,
}

fn main() {
    let cmd = App::new("forge cell")
        .version("0.1.0")
        .author("Kanari <iovo7c@gmail.com>")
        .about("Runs a program under rlimits and reports its resource usage")
        .arg(
            Arg::with_name("memory_limit")
                .long("memory_limit")
                .short("m")
                .help("set memory limit(MiB) for code")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("time_limit")
                .long("time_limit")
                .short("t")
                .help("set cpu time limit(ms) for code")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("real_time_limit")
                .long("real_time_limit")
                .short("r")
                .help("kill code after this many ms of wall time")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .short("o")
                .help("where to write the usage report")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("path")
                .index(1)
                .help("program, looked up in PATH when it has no slash")
                .required(true),
        )
        .arg(
            Arg::with_name("raw")
                .multiple(true)
                .last(true)
                .help("arguments for code"),
        )
        .get_matches();

    if let Err(err) = run(&cmd) {
        eprintln!("cell: {}", err);
        std::process::exit(1);
    }
}

fn number(cmd: &ArgMatches, name: &str) -> Result<Option<u64>, Box<dyn Error>> {
    match cmd.value_of(name) {
        Some(v) => Ok(Some(v.trim().parse::<u64>()?)),
        None => Ok(None),
    }
}

fn run(cmd: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let memory_limit = number(cmd, "memory_limit")?;
    let time_limit = number(cmd, "time_limit")?;
    let real_time_limit = number(cmd, "real_time_limit")?;
    let output = cmd.value_of("output").ok_or("missing report path")?;
    let path = cmd.value_of("path").ok_or("missing program")?;

    // everything the child touches is prepared before forking
    let program = CString::new(path)?;
    let mut args = vec![program.clone()];
    for arg in cmd.values_of("raw").into_iter().flatten() {
        args.push(CString::new(arg)?);
    }
    let mut argv: Vec<*const libc::c_char> = args.iter().map(|a| a.as_ptr()).collect();
    argv.push(ptr::null());

    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error().into());
    }
    if pid == 0 {
        unsafe {
            if let Some(lim) = memory_limit {
                set_memory_limit(lim);
            }
            if let Some(lim) = time_limit {
                set_time_limit(lim);
            }
            libc::execvp(program.as_ptr(), argv.as_ptr());
            libc::_exit(EXEC_FAILED);
        }
    }

    let killed = Arc::new(AtomicBool::new(false));
    let (done, finished) = mpsc::channel::<()>();
    let watchdog = real_time_limit.map(|ms| {
        let killed = killed.clone();
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = finished.recv_timeout(Duration::from_millis(ms))
            {
                killed.store(true, Ordering::SeqCst);
                unsafe {
                    libc::kill(pid, libc::SIGKILL);
                }
            }
        })
    });

    let (status, usage) = wait(pid)?;
    let _ = done.send(());
    if let Some(watchdog) = watchdog {
        let _ = watchdog.join();
    }

    let (exitcode, signal) = unsafe {
        if libc::WIFEXITED(status) {
            (Some(libc::WEXITSTATUS(status)), None)
        } else if libc::WIFSIGNALED(status) {
            (None, Some(libc::WTERMSIG(status)))
        } else {
            (None, None)
        }
    };
    let millis = |t: libc::timeval| (t.tv_sec * 1000 + t.tv_usec / 1000) as u64;

    let report = Report {
        exitcode,
        signal,
        killed: killed.load(Ordering::SeqCst),
        time: millis(usage.ru_utime) + millis(usage.ru_stime),
        memory: usage.ru_maxrss as u64,
    };
    fs::write(output, serde_yaml::to_string(&report)?)?;
    Ok(())
}

/// Reap the child, retrying on EINTR.
fn wait(pid: libc::pid_t) -> io::Result<(libc::c_int, libc::rusage)> {
    let mut status: libc::c_int = 0;
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    loop {
        let r = unsafe { libc::wait4(pid, &mut status, 0, &mut usage) };
        if r >= 0 {
            return Ok((status, usage));
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Address space is capped at twice the limit, leaving the precise check
/// to the measured peak.
unsafe fn set_memory_limit(lim: u64) {
    let ctx = libc::rlimit {
        rlim_cur: lim << 10 << 10 << 1,
        rlim_max: lim << 10 << 10 << 1,
    };
    libc::setrlimit(libc::RLIMIT_AS, &ctx);
}

/// Whole seconds, rounded up, plus one.
unsafe fn set_time_limit(lim: u64) {
    let secs = (lim + 999) / 1000 + 1;
    let ctx = libc::rlimit {
        rlim_cur: secs,
        rlim_max: secs,
    };
    libc::setrlimit(libc::RLIMIT_CPU, &ctx);
}
