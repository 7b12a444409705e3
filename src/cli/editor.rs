use std::fs;
use std::io::Write;
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Open `initial` in an external editor and return the saved contents.
///
/// `editor` may carry arguments (`code --wait`); the temp file path is
/// appended last.
pub fn edit_spell(editor: &str, initial: &str) -> Result<String> {
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("editor command is empty");
    };

    let mut file = tempfile::Builder::new()
        .prefix("spell-")
        .suffix(".toml")
        .tempfile()
        .context("Failed to create temporary spell file")?;
    file.write_all(initial.as_bytes())?;
    file.flush()?;

    tracing::debug!(editor = %editor, path = %file.path().display(), "Launching editor");
    let status = Command::new(program)
        .args(parts)
        .arg(file.path())
        .status()
        .with_context(|| format!("Failed to launch editor `{editor}`"))?;
    if !status.success() {
        bail!("editor `{editor}` exited with {status}");
    }

    fs::read_to_string(file.path()).context("Failed to read edited spell")
}
