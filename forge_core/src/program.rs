use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::SystemTime,
};

use log::{debug, info};

use crate::{
    error::{Error, Result},
    language::Language,
};

/// What a source file is used for. Each role lives in its own directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Checker,
    Interactor,
    Validator,
    Generator,
    Solution,
}

impl Role {
    pub fn directory(self) -> &'static str {
        match self {
            Role::Checker => "checkers",
            Role::Interactor => "interactors",
            Role::Validator => "validators",
            Role::Generator => "generators",
            Role::Solution => "solutions",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Checker => "checker",
            Role::Interactor => "interactor",
            Role::Validator => "validator",
            Role::Generator => "generator",
            Role::Solution => "solution",
        }
    }
}

/// Something that can be started as a process.
pub trait Executable {
    fn identifier(&self) -> &str;
    /// Program followed by its fixed arguments.
    fn command(&self) -> Result<Vec<String>>;
    /// File whose modification time tracks the runnable form.
    fn artifact(&self) -> &Path;
}

/// Build a `Command` for `exe`, ready to receive extra arguments.
pub fn prepare(exe: &dyn Executable) -> Result<Command> {
    let words = exe.command()?;
    let (program, args) = words
        .split_first()
        .ok_or_else(|| Error::Command(exe.identifier().into()))?;
    let mut command = Command::new(program);
    command.args(args);
    Ok(command)
}

pub(crate) fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// A source file of a problem together with its build recipe.
#[derive(Debug, Clone)]
pub struct Program {
    pub role: Role,
    pub identifier: String,
    pub source: PathBuf,
    /// The `<stem>.yaml` next to the source, if there is one.
    pub descriptor: Option<PathBuf>,
    pub executable: PathBuf,
    pub language: Language,
    pub include_dirs: Vec<PathBuf>,
}

impl Program {
    pub fn compile(&self) -> Result<()> {
        let words =
            match self
                .language
                .compile_command(&self.source, &self.executable, &self.include_dirs)?
            {
                Some(words) => words,
                None => return Ok(()),
            };
        let (program, args) = words
            .split_first()
            .ok_or_else(|| Error::Command(self.identifier.clone()))?;

        info!(
            "compiling {} `{}` with {}",
            self.role.name(),
            self.identifier,
            self.language.name
        );
        if let Some(parent) = self.executable.parent() {
            fs::create_dir_all(parent)?;
        }

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;
        if !output.status.success() {
            return Err(Error::Compile {
                path: self.source.clone(),
                msg: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Whether this is one of the programs shipped with the tool.
    pub fn is_standard(&self) -> bool {
        crate::standard::strip(&self.identifier).is_some()
    }

    /// Compile unless the executable is newer than the source and its
    /// descriptor. Returns whether a compilation happened.
    pub fn ensure_compiled(&self) -> Result<bool> {
        if !self.language.needs_compile() {
            return Ok(false);
        }
        let source_time = fs::metadata(&self.source)?.modified()?;
        let newest = match self.descriptor.as_deref().and_then(modified) {
            Some(t) if t > source_time => t,
            _ => source_time,
        };
        match modified(&self.executable) {
            Some(built) if built > newest => {
                debug!("{} `{}` is up to date", self.role.name(), self.identifier);
                Ok(false)
            }
            _ => {
                self.compile()?;
                Ok(true)
            }
        }
    }
}

impl Executable for Program {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn command(&self) -> Result<Vec<String>> {
        self.language
            .execute_command(&self.source, &self.executable)
    }

    fn artifact(&self) -> &Path {
        if self.language.needs_compile() {
            &self.executable
        } else {
            &self.source
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(dir: &Path, language: Language) -> Program {
        Program {
            role: Role::Generator,
            identifier: "gen".into(),
            source: dir.join("gen.sh"),
            descriptor: None,
            executable: dir.join("build/gen"),
            language,
            include_dirs: Vec::new(),
        }
    }

    #[test]
    fn interpreted_artifact_is_source() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let p = program(dir.path(), Language::new("sh", None, "sh {src}"));
        assert_eq!(p.artifact(), dir.path().join("gen.sh").as_path());
        assert!(!p.ensure_compiled()?);
        assert_eq!(
            p.command()?,
            vec!["sh".to_string(), dir.path().join("gen.sh").display().to_string()]
        );
        Ok(())
    }

    #[test]
    fn compiles_once_until_source_changes() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        fs::write(dir.path().join("gen.sh"), "echo 1\n")?;
        let p = program(
            dir.path(),
            Language::new("copy", Some("cp {src} {exe}"), "sh {exe}"),
        );

        assert!(p.ensure_compiled()?);
        assert!(p.executable.exists());
        assert!(!p.ensure_compiled()?);

        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(dir.path().join("gen.sh"), "echo 2\n")?;
        assert!(p.ensure_compiled()?);
        assert_eq!(fs::read_to_string(&p.executable)?, "echo 2\n");
        Ok(())
    }

    #[test]
    fn compile_failure_reports_stderr() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        fs::write(dir.path().join("gen.sh"), "")?;
        let p = program(
            dir.path(),
            Language::new("broken", Some("sh -c 'echo nope >&2; exit 1'"), "{exe}"),
        );
        match p.compile() {
            Err(Error::Compile { msg, .. }) => assert_eq!(msg, "nope"),
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }
}
