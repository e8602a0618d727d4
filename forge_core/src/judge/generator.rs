use std::{
    fs::{self, File},
    path::Path,
    process::Stdio,
};

use log::info;

use super::comment_of;
use crate::{
    error::{Error, Result},
    program::{prepare, Executable},
};

/// Run the generator with `args` and store its stdout at `path`.
/// A failed run leaves no file behind.
pub fn generate(generator: &dyn Executable, args: &[String], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    info!(
        "generating {} with `{} {}`",
        path.display(),
        generator.identifier(),
        args.join(" ")
    );

    let result = prepare(generator)?
        .args(args)
        .stdin(Stdio::null())
        .stdout(File::create(path)?)
        .stderr(Stdio::piped())
        .output()?;

    if !result.status.success() {
        fs::remove_file(path)?;
        let mut command = vec![generator.identifier().to_string()];
        command.extend(args.iter().cloned());
        return Err(Error::Generate {
            command: command.join(" "),
            msg: format!("{}: {}", result.status, comment_of(&result)),
        });
    }
    Ok(())
}
