//! Reuse of previously recorded verdicts.
//!
//! A record is fresh when every input it was derived from is strictly older
//! than the record file itself. Both sides are file modification times, so
//! they come from the same clock.

use std::{
    fs,
    io::ErrorKind,
    path::Path,
    thread,
    time::{Duration, SystemTime},
};

use log::{debug, warn};

use crate::{error::Result, program::modified, verdict::ExecutionOutcome};

/// How many times a record is rewritten while waiting for the filesystem
/// clock to move past its inputs.
const STAMP_ATTEMPTS: usize = 200;
const STAMP_RETRY: Duration = Duration::from_millis(1);

/// A file a record depends on, with its modification time if it exists.
#[derive(Debug, Clone, Copy)]
pub struct Dependency<'a> {
    pub path: &'a Path,
    pub modified: Option<SystemTime>,
}

impl<'a> Dependency<'a> {
    pub fn probe(path: &'a Path) -> Self {
        Self {
            path,
            modified: modified(path),
        }
    }
}

/// Whether something produced at `produced_at` must be produced again.
pub fn is_stale(produced_at: Option<SystemTime>, dependencies: &[Dependency]) -> bool {
    let produced_at = match produced_at {
        Some(t) => t,
        None => return true,
    };
    dependencies.iter().any(|dep| match dep.modified {
        Some(t) if t < produced_at => false,
        Some(_) => {
            debug!("{} changed since the last run", dep.path.display());
            true
        }
        None => {
            debug!("{} is missing", dep.path.display());
            true
        }
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerdictRecord {
    pub outcome: ExecutionOutcome,
    /// Modification time of the record file.
    pub judged_at: SystemTime,
}

/// Read a record. Missing or unreadable records count as absent.
pub fn load_record(path: &Path) -> Result<Option<VerdictRecord>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let judged_at = fs::metadata(path)?.modified()?;
    match serde_yaml::from_str(&content) {
        Ok(outcome) => Ok(Some(VerdictRecord { outcome, judged_at })),
        Err(err) => {
            warn!("ignoring corrupt verdict record {}: {}", path.display(), err);
            Ok(None)
        }
    }
}

/// Persist `outcome`. The record is rewritten until its modification time
/// is strictly after that of every file in `dependencies`, so that a later
/// change to any of them is always seen.
pub fn store_record(
    path: &Path,
    outcome: &ExecutionOutcome,
    dependencies: &[&Path],
) -> Result<VerdictRecord> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_yaml::to_string(outcome)?;
    let newest = dependencies.iter().filter_map(|dep| modified(dep)).max();

    let mut judged_at = SystemTime::UNIX_EPOCH;
    for attempt in 0..STAMP_ATTEMPTS {
        if attempt > 0 {
            thread::sleep(STAMP_RETRY);
        }
        fs::write(path, &content)?;
        judged_at = fs::metadata(path)?.modified()?;
        if newest.map_or(true, |t| t < judged_at) {
            break;
        }
    }
    if newest.map_or(false, |t| t >= judged_at) {
        warn!(
            "verdict record {} is not newer than its inputs, it will be redone",
            path.display()
        );
    }
    Ok(VerdictRecord {
        outcome: outcome.clone(),
        judged_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::Verdict;
    use std::time::Duration;

    fn at(secs: u64) -> Option<SystemTime> {
        Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }

    #[test]
    fn freshness() {
        let (a, b) = (Path::new("a"), Path::new("b"));
        let deps = [
            Dependency { path: a, modified: at(10) },
            Dependency { path: b, modified: at(20) },
        ];
        assert!(is_stale(None, &deps));
        assert!(!is_stale(at(21), &deps));
        assert!(is_stale(at(20), &deps));
        assert!(is_stale(at(15), &deps));
        assert!(!is_stale(at(1), &[]));

        let missing = [Dependency { path: a, modified: None }];
        assert!(is_stale(at(100), &missing));
    }

    #[test]
    fn records_persist() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("verdicts/main/01.yaml");
        assert!(load_record(&path)?.is_none());

        let outcome = ExecutionOutcome::new(Verdict::WrongAnswer, 0.5, 12.0);
        let stored = store_record(&path, &outcome, &[])?;
        let loaded = load_record(&path)?.unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(loaded.outcome, outcome);

        fs::write(&path, "verdict: [")?;
        assert!(load_record(&path)?.is_none());
        Ok(())
    }

    #[test]
    fn edits_right_after_a_record_are_seen() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let input = dir.path().join("input");
        let path = dir.path().join("verdicts/main/01.yaml");
        let outcome = ExecutionOutcome::new(Verdict::Ok, 0.1, 1.0);

        for round in 0..20 {
            fs::write(&input, format!("{}\n", round))?;
            let record = store_record(&path, &outcome, &[&input])?;
            assert!(!is_stale(Some(record.judged_at), &[Dependency::probe(&input)]));

            fs::write(&input, "edited\n")?;
            let record = load_record(&path)?.unwrap();
            assert!(is_stale(Some(record.judged_at), &[Dependency::probe(&input)]));
        }
        Ok(())
    }
}
