use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_execute() -> String {
    "{exe}".into()
}

/// A compiler or interpreter setup.
///
/// Templates are split shell-style, then `{src}` and `{exe}` are substituted
/// inside every word and a standalone `{inc}` word becomes one `-I<dir>` per
/// resource directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub compile: Option<String>,
    #[serde(default = "default_execute")]
    pub execute: String,
    #[serde(default)]
    pub autodetect: Vec<String>,
}

impl Language {
    pub fn new(name: &str, compile: Option<&str>, execute: &str) -> Self {
        Self {
            name: name.into(),
            compile: compile.map(Into::into),
            execute: execute.into(),
            autodetect: Vec::new(),
        }
    }

    pub fn needs_compile(&self) -> bool {
        self.compile.is_some()
    }

    pub fn compile_command(
        &self,
        src: &Path,
        exe: &Path,
        include_dirs: &[PathBuf],
    ) -> Result<Option<Vec<String>>> {
        match &self.compile {
            Some(template) => render(template, src, exe, include_dirs).map(Some),
            None => Ok(None),
        }
    }

    pub fn execute_command(&self, src: &Path, exe: &Path) -> Result<Vec<String>> {
        render(&self.execute, src, exe, &[])
    }

    /// Whether `path` has one of the extensions this language claims.
    pub fn detects(&self, path: &Path) -> bool {
        let extension = match path.extension() {
            Some(ext) => format!(".{}", ext.to_string_lossy()),
            None => return false,
        };
        self.autodetect.iter().any(|e| *e == extension)
    }
}

pub fn render(
    template: &str,
    src: &Path,
    exe: &Path,
    include_dirs: &[PathBuf],
) -> Result<Vec<String>> {
    let words = shlex::split(template).ok_or_else(|| Error::Command(template.into()))?;
    let src = src.to_string_lossy();
    let exe = exe.to_string_lossy();

    let mut command = Vec::with_capacity(words.len());
    for word in words {
        if word == "{inc}" {
            command.extend(include_dirs.iter().map(|d| format!("-I{}", d.display())));
            continue;
        }
        command.push(word.replace("{src}", &src).replace("{exe}", &exe));
    }

    if command.is_empty() {
        return Err(Error::Command(template.into()));
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_template_with_includes() -> Result<()> {
        let lang = Language::new(
            "c++17",
            Some("g++ -O2 -std=c++17 {src} -o {exe} {inc}"),
            "{exe}",
        );
        let cmd = lang
            .compile_command(
                Path::new("/p/solutions/a.cpp"),
                Path::new("/p/build/a"),
                &[PathBuf::from("/p/resources"), PathBuf::from("/r")],
            )?
            .unwrap();
        assert_eq!(
            cmd,
            vec![
                "g++",
                "-O2",
                "-std=c++17",
                "/p/solutions/a.cpp",
                "-o",
                "/p/build/a",
                "-I/p/resources",
                "-I/r"
            ]
        );
        Ok(())
    }

    #[test]
    fn interpreted_language() -> Result<()> {
        let lang = Language::new("python3", None, "python3 {src}");
        assert!(!lang.needs_compile());
        assert_eq!(
            lang.execute_command(Path::new("/x/gen.py"), Path::new("/x/gen"))?,
            vec!["python3", "/x/gen.py"]
        );
        Ok(())
    }

    #[test]
    fn empty_template_is_rejected() {
        let lang = Language::new("void", None, "  ");
        assert!(lang.execute_command(Path::new("a"), Path::new("b")).is_err());
    }

    #[test]
    fn detection_by_extension() {
        let mut lang = Language::new("c11", Some("gcc {src} -o {exe}"), "{exe}");
        lang.autodetect = vec![".c".into()];
        assert!(lang.detects(Path::new("sol.c")));
        assert!(!lang.detects(Path::new("sol.cpp")));
        assert!(!lang.detects(Path::new("Makefile")));
    }
}
