//! `files`: static or rendered files copied into place.
use std::path::PathBuf;
use std::sync::Arc;

use super::basename;
use crate::config::Item;
use crate::error::BootError;
use crate::tasks::Context;

/// Section name.
pub const SECTION: &str = "files";

/// Fetch the file's content and schedule copying it to `file`.
///
/// With `template`, `/templates/{template}` is rendered.  Otherwise
/// `/files/{source}` is used, `source` defaulting to the basename of
/// `file`.
///
/// # Errors
///
/// Returns [`crate::error::BuildError`] if `file` is missing, and fatal
/// fetch or render errors.
pub fn process(ctx: &mut Context<'_>, item: &Item<'_>) -> Result<(), BootError> {
    let file = item.require_str("file")?;
    let target = PathBuf::from(file);
    let description = format!("setting up {file}");

    let install = move |ctx: &mut Context<'_>, staged: PathBuf| -> Result<(), BootError> {
        let fs_ops = Arc::clone(&ctx.fs_ops);
        ctx.task(description, move || fs_ops.copy(&staged, &target));
        Ok(())
    };

    match item.str("template")? {
        Some(template) => ctx.fetch_template(template, install),
        None => {
            let source = item.str("source")?.unwrap_or_else(|| basename(file));
            ctx.fetch_file(&format!("/files/{source}"), install)
        }
    }
}
