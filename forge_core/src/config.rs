use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    language::Language,
};

/// Built-in tool configuration. Works when compilers are in `PATH`.
pub const DEFAULT_CONFIG: &str = r#"
languages:
  c++11:
    compile: "g++ -Wall -O2 -lm -std=c++11 {src} -o {exe} {inc}"
  c++14:
    compile: "g++ -Wall -O2 -lm -std=c++14 {src} -o {exe} {inc}"
  c++17:
    compile: "g++ -Wall -O2 -lm -std=c++17 {src} -o {exe} {inc}"
    autodetect: [".cc", ".cpp"]
  c11:
    compile: "gcc -Wall -O2 -lm -std=c11 {src} -o {exe} {inc}"
    autodetect: [".c"]
  python3:
    execute: "python3 {src}"
    autodetect: [".py"]
"#;

/// Tool-wide settings, independent of any problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Explicit path of the time accounting helper.
    #[serde(default)]
    pub cell: Option<PathBuf>,
    #[serde(default)]
    pub languages: BTreeMap<String, Language>,
}

impl Config {
    pub fn from_string(content: &str) -> Result<Self> {
        let mut v: Self = serde_yaml::from_str(content)?;
        for (name, lang) in v.languages.iter_mut() {
            lang.name = name.clone();
        }
        Ok(v)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_string(DEFAULT_CONFIG)
    }

    /// Built-in defaults overlaid with the file's settings.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let user = Self::from_string(&content)?;
        let mut v = Self::builtin()?;
        v.languages.extend(user.languages);
        if user.cell.is_some() {
            v.cell = user.cell;
        }
        Ok(v)
    }

    /// Register (or replace) a language under its own name.
    pub fn with_language(mut self, language: Language) -> Self {
        self.languages.insert(language.name.clone(), language);
        self
    }

    pub fn language(&self, name: &str) -> Result<&Language> {
        self.languages
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("language {}", name)))
    }

    pub fn detect(&self, path: &Path) -> Option<&Language> {
        self.languages.values().find(|lang| lang.detects(path))
    }
}
