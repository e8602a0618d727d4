//! Checkers and validators shipped with the tool, referred to by problems
//! as `standard.<name>`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{error::Result, program::Role};

pub const PREFIX: &str = "standard.";
/// Language the bundled programs are written in.
pub const LANGUAGE: &str = "c++11";

static HEADER: &str = include_str!("../data/resources/forge_check.h");

static CHECKERS: &[(&str, &str)] = &[
    ("fcmp", include_str!("../data/checkers/fcmp.cpp")),
    ("hcmp", include_str!("../data/checkers/hcmp.cpp")),
    ("lcmp", include_str!("../data/checkers/lcmp.cpp")),
    ("ncmp", include_str!("../data/checkers/ncmp.cpp")),
    ("wcmp", include_str!("../data/checkers/wcmp.cpp")),
    ("yesno", include_str!("../data/checkers/yesno.cpp")),
];

static VALIDATORS: &[(&str, &str)] = &[("wfval", include_str!("../data/validators/wfval.cpp"))];

fn bundled(role: Role) -> &'static [(&'static str, &'static str)] {
    match role {
        Role::Checker => CHECKERS,
        Role::Validator => VALIDATORS,
        _ => &[],
    }
}

/// Names of the standard programs available for `role`.
pub fn names(role: Role) -> Vec<&'static str> {
    bundled(role).iter().map(|(name, _)| *name).collect()
}

/// The name inside a `standard.<name>` identifier.
pub fn strip(identifier: &str) -> Option<&str> {
    identifier.strip_prefix(PREFIX)
}

/// A bundled program unpacked on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Installed {
    pub source: PathBuf,
    pub resources: PathBuf,
}

/// Unpack the standard program `name` of `role` under `dir`. Files already
/// holding the right content are left untouched, so their modification
/// times keep the compiled executable valid. `None` when there is no such
/// program.
pub fn install(dir: &Path, role: Role, name: &str) -> Result<Option<Installed>> {
    let content = match bundled(role).iter().find(|(n, _)| *n == name) {
        Some((_, content)) => *content,
        None => return Ok(None),
    };
    let resources = dir.join("resources");
    let source = dir.join(role.directory()).join(format!("{}.cpp", name));
    write_if_changed(&resources.join("forge_check.h"), HEADER)?;
    write_if_changed(&source, content)?;
    Ok(Some(Installed { source, resources }))
}

fn write_if_changed(path: &Path, content: &str) -> Result<()> {
    if let Ok(current) = fs::read_to_string(path) {
        if current == content {
            return Ok(());
        }
    }
    debug!("unpacking {}", path.display());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::modified;

    #[test]
    fn available_programs() {
        assert_eq!(
            names(Role::Checker),
            vec!["fcmp", "hcmp", "lcmp", "ncmp", "wcmp", "yesno"]
        );
        assert_eq!(names(Role::Validator), vec!["wfval"]);
        assert!(names(Role::Solution).is_empty());
        assert_eq!(strip("standard.lcmp"), Some("lcmp"));
        assert_eq!(strip("lcmp"), None);
    }

    #[test]
    fn install_keeps_unchanged_files() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let installed = install(dir.path(), Role::Checker, "lcmp")?.unwrap();
        assert_eq!(installed.source, dir.path().join("checkers/lcmp.cpp"));
        assert!(fs::read_to_string(&installed.source)?.contains("forge_check.h"));
        assert!(installed.resources.join("forge_check.h").is_file());

        let before = modified(&installed.source);
        std::thread::sleep(std::time::Duration::from_millis(20));
        install(dir.path(), Role::Checker, "lcmp")?;
        assert_eq!(modified(&installed.source), before);

        assert!(install(dir.path(), Role::Checker, "nope")?.is_none());
        assert!(install(dir.path(), Role::Solution, "lcmp")?.is_none());
        Ok(())
    }
}
