use std::{
    fs,
    path::{Path, PathBuf},
};

use forge_core::{
    error::{Error, Result},
    judge::{checker, generator, validator},
    Executable, Verdict,
};

/// A shell snippet run with `sh -c`.
struct Snippet {
    name: String,
    script: String,
    artifact: PathBuf,
}

impl Snippet {
    fn new(name: &str, script: &str) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            artifact: PathBuf::from("/bin/sh"),
        }
    }
}

impl Executable for Snippet {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn command(&self) -> Result<Vec<String>> {
        Ok(vec![
            "sh".into(),
            "-c".into(),
            self.script.clone(),
            self.name.clone(),
        ])
    }

    fn artifact(&self) -> &Path {
        &self.artifact
    }
}

fn files() -> Result<(tempfile::TempDir, PathBuf, PathBuf, PathBuf)> {
    let dir = tempfile::TempDir::new()?;
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    let answer = dir.path().join("answer");
    fs::write(&input, "1 2\n")?;
    fs::write(&output, "3\n")?;
    fs::write(&answer, "3\n")?;
    Ok((dir, input, output, answer))
}

#[test]
fn checker_exit_codes_map_to_verdicts() -> Result<()> {
    let (_dir, input, output, answer) = files()?;
    let cases = [
        (0, Verdict::Ok),
        (1, Verdict::WrongAnswer),
        (2, Verdict::PresentationError),
        (99, Verdict::CheckFailed),
    ];
    for (code, expected) in cases.iter() {
        let script = format!("echo '  line {}  ' >&2; exit {}", code, code);
        let result = checker::judge(&Snippet::new("chk", &script), &input, &output, &answer)?;
        assert_eq!(result.verdict, *expected);
        assert_eq!(result.comment, format!("line {}", code));
    }
    Ok(())
}

#[test]
fn checker_receives_paths_in_order() -> Result<()> {
    let (_dir, input, output, answer) = files()?;
    let script = "[ \"$(cat \"$1\")\" = '1 2' ] && [ \"$(cat \"$2\")\" = \"$(cat \"$3\")\" ]";
    let result = checker::judge(&Snippet::new("chk", script), &input, &output, &answer)?;
    assert_eq!(result.verdict, Verdict::Ok);

    fs::write(&output, "4\n")?;
    let result = checker::judge(&Snippet::new("chk", script), &input, &output, &answer)?;
    assert_eq!(result.verdict, Verdict::WrongAnswer);
    Ok(())
}

#[test]
fn validators_read_stdin_and_stop_at_first_rejection() -> Result<()> {
    let (_dir, input, _, _) = files()?;
    let reads = Snippet::new("reads", "read a b; [ \"$a\" -lt \"$b\" ]");
    let named = Snippet::new("named", "[ -f \"$1\" ]");
    let picky = Snippet::new("picky", "echo 'b too small' >&2; exit 3");
    let never = Snippet::new("never", "exit 0");

    assert_eq!(validator::validate(&reads, &input)?.verdict, Verdict::Ok);

    let stack: Vec<&dyn Executable> = vec![&reads, &named];
    assert!(validator::validate_all(&stack, &input)?.is_none());

    let stack: Vec<&dyn Executable> = vec![&reads, &picky, &never];
    let rejection = validator::validate_all(&stack, &input)?.unwrap();
    assert_eq!(rejection.validator, "picky");
    assert_eq!(rejection.verdict.verdict, Verdict::ValidationFailed);
    assert_eq!(rejection.verdict.comment, "b too small");
    Ok(())
}

#[test]
fn generator_output_and_failure() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("nested/input");

    let gen = Snippet::new("gen", "echo \"$@\"");
    generator::generate(&gen, &["5".into(), "x".into()], &path)?;
    assert_eq!(fs::read_to_string(&path)?, "5 x\n");

    let broken = Snippet::new("broken", "echo partial; echo oops >&2; exit 1");
    let failed = generator::generate(&broken, &["1".into()], &path);
    assert!(matches!(failed, Err(Error::Generate { .. })));
    assert!(!path.exists());
    Ok(())
}
