use std::{
    collections::BTreeSet,
    fmt, fs,
    path::{Path, PathBuf},
};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{Error, Result},
    language::Language,
    program::{Program, Role},
    solution::Solution,
    standard,
    tag::SolutionTag,
    verdict::{LimitConfig, Verdict},
};

pub const PROBLEM_DESCRIPTOR: &str = "problem.yaml";
/// Everything the tool produces lives under this directory of the problem.
pub const BUILD_DIR: &str = "forge-build";
pub const TEST_DIR: &str = "tests";
pub const RESOURCE_DIR: &str = "resources";

/// Where a program reads its input or writes its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileName {
    Stdio,
    File(String),
}

impl Default for FileName {
    fn default() -> Self {
        FileName::Stdio
    }
}

impl FileName {
    pub fn is_stdio(&self) -> bool {
        *self == FileName::Stdio
    }
}

impl From<String> for FileName {
    fn from(s: String) -> Self {
        match s.trim() {
            "" | "stdio" | "standard_io" => FileName::Stdio,
            name => FileName::File(name.into()),
        }
    }
}

impl From<FileName> for String {
    fn from(name: FileName) -> Self {
        match name {
            FileName::Stdio => "stdio".into(),
            FileName::File(name) => name,
        }
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileName::Stdio => f.write_str("stdio"),
            FileName::File(name) => f.write_str(name),
        }
    }
}

/// Contents of `problem.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemConfig {
    pub internal_name: String,
    #[serde(default)]
    pub input_file: FileName,
    #[serde(default)]
    pub output_file: FileName,
    #[serde(default)]
    pub interactive: bool,
    #[serde(flatten)]
    pub limits: LimitConfig,
    #[serde(default)]
    pub active_checker: Option<String>,
    #[serde(default)]
    pub active_interactor: Option<String>,
    #[serde(default)]
    pub active_validators: Vec<String>,
}

impl ProblemConfig {
    pub fn new(internal_name: &str) -> Self {
        Self {
            internal_name: internal_name.into(),
            input_file: FileName::Stdio,
            output_file: FileName::Stdio,
            interactive: false,
            limits: LimitConfig::default(),
            active_checker: None,
            active_interactor: None,
            active_validators: Vec::new(),
        }
    }
}

/// Contents of `<stem>.yaml` next to a source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verdicts: Vec<Verdict>,
}

/// Contents of `tests/NN.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestDescriptor {
    #[serde(default)]
    pub sample: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<String>,
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// File name of test number `index`, e.g. `07`.
pub fn test_name(index: usize) -> String {
    format!("{:02}", index)
}

#[derive(Debug, Clone, PartialEq)]
enum Location {
    Problem(PathBuf),
    Scratch(PathBuf),
}

/// One test of a problem, or a throwaway test living in a scratch directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Test {
    pub index: usize,
    pub sample: bool,
    /// Generator command producing the input; `None` for manual tests.
    pub generate: Option<String>,
    location: Location,
}

impl Test {
    pub fn new(root: &Path, index: usize, descriptor: TestDescriptor) -> Self {
        Self {
            index,
            sample: descriptor.sample,
            generate: descriptor.generate,
            location: Location::Problem(root.to_path_buf()),
        }
    }

    /// A generated test whose files all live under `dir`. Never cached.
    pub fn scratch(dir: &Path, generate: String) -> Self {
        Self {
            index: 0,
            sample: false,
            generate: Some(generate),
            location: Location::Scratch(dir.to_path_buf()),
        }
    }

    pub fn is_scratch(&self) -> bool {
        matches!(self.location, Location::Scratch(_))
    }

    pub fn name(&self) -> String {
        match &self.location {
            Location::Problem(_) => test_name(self.index),
            Location::Scratch(_) => "scratch".into(),
        }
    }

    pub fn descriptor_path(&self) -> Option<PathBuf> {
        match &self.location {
            Location::Problem(root) => Some(
                root.join(TEST_DIR)
                    .join(format!("{}.yaml", test_name(self.index))),
            ),
            Location::Scratch(_) => None,
        }
    }

    pub fn input_path(&self) -> PathBuf {
        match &self.location {
            Location::Problem(root) if self.generate.is_some() => root
                .join(BUILD_DIR)
                .join(TEST_DIR)
                .join(test_name(self.index)),
            Location::Problem(root) => root.join(TEST_DIR).join(test_name(self.index)),
            Location::Scratch(dir) => dir.join("input"),
        }
    }

    /// Where `solution`'s output on this test is kept. For interactive
    /// problems this holds the interactor's transcript.
    pub fn output_path(&self, solution: &str) -> PathBuf {
        match &self.location {
            Location::Problem(root) => root
                .join(BUILD_DIR)
                .join("outputs")
                .join(solution)
                .join(test_name(self.index)),
            Location::Scratch(dir) => dir.join("outputs").join(solution),
        }
    }

    pub fn verdict_path(&self, solution: &str) -> Option<PathBuf> {
        match &self.location {
            Location::Problem(root) => Some(
                root.join(BUILD_DIR)
                    .join("verdicts")
                    .join(solution)
                    .join(format!("{}.yaml", test_name(self.index))),
            ),
            Location::Scratch(_) => None,
        }
    }
}

/// A problem directory with its configuration.
#[derive(Debug, Clone)]
pub struct Problem {
    root: PathBuf,
    pub config: ProblemConfig,
    tool: Config,
}

impl Problem {
    pub fn load(root: impl AsRef<Path>, tool: &Config) -> Result<Self> {
        let root = fs::canonicalize(root.as_ref()).map_err(|_| {
            Error::NotFound(format!("problem directory {}", root.as_ref().display()))
        })?;
        let config = read_yaml(&root.join(PROBLEM_DESCRIPTOR))?;
        Ok(Self {
            root,
            config,
            tool: tool.clone(),
        })
    }

    pub fn new(root: impl AsRef<Path>, config: ProblemConfig, tool: &Config) -> Result<Self> {
        Ok(Self {
            root: fs::canonicalize(root)?,
            config,
            tool: tool.clone(),
        })
    }

    /// Write the configuration back to `problem.yaml`.
    pub fn save(&self) -> Result<()> {
        fs::write(
            self.root.join(PROBLEM_DESCRIPTOR),
            serde_yaml::to_string(&self.config)?,
        )?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.config.internal_name
    }

    pub fn limits(&self) -> LimitConfig {
        self.config.limits
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }

    pub fn test_dir(&self) -> PathBuf {
        self.root.join(TEST_DIR)
    }

    fn source_dir(&self, role: Role) -> PathBuf {
        self.root.join(role.directory())
    }

    /// The source file of `identifier`: `<stem>.<ext>` or an extensionless `<stem>`.
    fn source_file(&self, role: Role, identifier: &str) -> Result<Option<PathBuf>> {
        let dir = self.source_dir(role);
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut found = None;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_source = path.is_file()
                && path.file_stem().map_or(false, |s| s == identifier)
                && path.extension().map_or(true, |e| e != "yaml");
            if is_source {
                if found.is_some() {
                    return Err(Error::configuration(format!(
                        "more than one source file for {} `{}`",
                        role.name(),
                        identifier
                    )));
                }
                found = Some(path);
            }
        }
        Ok(found)
    }

    fn descriptor(&self, role: Role, identifier: &str) -> PathBuf {
        self.source_dir(role).join(format!("{}.yaml", identifier))
    }

    fn language_of(&self, source: &Path, descriptor: &SourceDescriptor) -> Result<Language> {
        let language = match &descriptor.language {
            Some(name) => Some(self.tool.language(name)?),
            None => self.tool.detect(source),
        };
        language.cloned().ok_or_else(|| {
            Error::configuration(format!(
                "cannot determine the language of {}",
                source.display()
            ))
        })
    }

    fn read_descriptor(
        &self,
        role: Role,
        identifier: &str,
    ) -> Result<(Option<PathBuf>, SourceDescriptor)> {
        let path = self.descriptor(role, identifier);
        if path.is_file() {
            let descriptor = read_yaml(&path)?;
            Ok((Some(path), descriptor))
        } else {
            Ok((None, SourceDescriptor::default()))
        }
    }

    fn resource_dirs(&self) -> Vec<PathBuf> {
        let resources = self.root.join(RESOURCE_DIR);
        if resources.is_dir() {
            vec![resources]
        } else {
            Vec::new()
        }
    }

    fn unknown_source(&self, role: Role, identifier: &str) -> Error {
        Error::UnknownSource {
            identifier: identifier.into(),
            directory: role.directory().into(),
            problem: self.name().into(),
        }
    }

    /// A program shipped with the tool, unpacked into the build directory.
    fn standard_source(&self, role: Role, identifier: &str, name: &str) -> Result<Program> {
        let installed = standard::install(&self.build_dir().join("standard"), role, name)?
            .ok_or_else(|| self.unknown_source(role, identifier))?;
        let mut include_dirs = self.resource_dirs();
        include_dirs.push(installed.resources);

        Ok(Program {
            role,
            identifier: identifier.into(),
            executable: self.build_dir().join(role.directory()).join(identifier),
            source: installed.source,
            descriptor: None,
            language: self.tool.language(standard::LANGUAGE)?.clone(),
            include_dirs,
        })
    }

    /// Resolve a source of `role` by identifier. `standard.<name>` refers
    /// to a program shipped with the tool.
    pub fn source(&self, role: Role, identifier: &str) -> Result<Program> {
        if let Some(name) = standard::strip(identifier) {
            return self.standard_source(role, identifier, name);
        }
        let source = self
            .source_file(role, identifier)?
            .ok_or_else(|| self.unknown_source(role, identifier))?;
        let (descriptor_path, descriptor) = self.read_descriptor(role, identifier)?;
        let language = self.language_of(&source, &descriptor)?;
        let include_dirs = self.resource_dirs();

        Ok(Program {
            role,
            identifier: identifier.into(),
            executable: self
                .build_dir()
                .join(role.directory())
                .join(identifier),
            source,
            descriptor: descriptor_path,
            language,
            include_dirs,
        })
    }

    /// Identifiers of all sources of `role` that have a descriptor, sorted.
    pub fn identifiers(&self, role: Role) -> Result<Vec<String>> {
        let dir = self.source_dir(role);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut found = BTreeSet::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(false, |e| e == "yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if self.descriptor(role, stem).is_file() {
                    found.insert(stem.to_string());
                }
            }
        }
        Ok(found.into_iter().collect())
    }

    /// Write descriptors for every source without one. Returns the
    /// identifiers that were registered.
    pub fn discover(&self, role: Role) -> Result<Vec<String>> {
        let dir = self.source_dir(role);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut added = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(false, |e| e == "yaml") {
                continue;
            }
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            let descriptor_path = self.descriptor(role, &stem);
            if descriptor_path.exists() {
                continue;
            }
            let language = match self.tool.detect(&path) {
                Some(lang) => lang.name.clone(),
                None => {
                    warn!("skipping {}: unknown language", path.display());
                    continue;
                }
            };
            let mut descriptor = SourceDescriptor {
                language: Some(language),
                ..SourceDescriptor::default()
            };
            if role == Role::Solution {
                descriptor.tag = Some("correct".into());
            }
            fs::write(&descriptor_path, serde_yaml::to_string(&descriptor)?)?;
            added.push(stem);
        }
        added.sort();
        Ok(added)
    }

    pub fn solution(&self, identifier: &str) -> Result<Solution> {
        let program = self.source(Role::Solution, identifier)?;
        let (_, descriptor) = self.read_descriptor(Role::Solution, identifier)?;
        let tag = match &descriptor.tag {
            Some(tag) => SolutionTag::from_descriptor(tag, &descriptor.verdicts)?,
            None => SolutionTag::default(),
        };
        Ok(Solution::new(program, tag))
    }

    pub fn solutions(&self) -> Result<Vec<Solution>> {
        self.identifiers(Role::Solution)?
            .iter()
            .map(|id| self.solution(id))
            .collect()
    }

    /// The single solution tagged `main`.
    pub fn main_solution(&self) -> Result<Solution> {
        let mut mains = self.solutions()?.into_iter().filter(Solution::is_main);
        let main = mains
            .next()
            .ok_or_else(|| Error::configuration("no main solution"))?;
        if let Some(other) = mains.next() {
            return Err(Error::configuration(format!(
                "more than one main solution: `{}` and `{}`",
                main.identifier(),
                other.identifier()
            )));
        }
        Ok(main)
    }

    /// Tests found in the test directory, ordered by index.
    ///
    /// `NN` alone is a manual test, `NN.yaml` describes a sample flag and
    /// possibly a generator command.
    pub fn tests(&self) -> Result<Vec<Test>> {
        let dir = self.test_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut indices = BTreeSet::new();
        for entry in fs::read_dir(&dir)? {
            let name = entry?.file_name();
            let name = match name.to_str() {
                Some(name) => name,
                None => continue,
            };
            let base = name.strip_suffix(".yaml").unwrap_or(name);
            match base.parse::<usize>() {
                Ok(index) if index > 0 && test_name(index) == base => {
                    indices.insert(index);
                }
                _ => warn!("ignoring {} in the test directory", name),
            }
        }

        let mut tests = Vec::with_capacity(indices.len());
        for index in indices {
            let path = dir.join(format!("{}.yaml", test_name(index)));
            let descriptor = if path.is_file() {
                read_yaml(&path)?
            } else {
                TestDescriptor::default()
            };
            tests.push(Test::new(&self.root, index, descriptor));
        }
        Ok(tests)
    }
}
