//! `mounts`: filesystems mounted by label.
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Item;
use crate::error::BootError;
use crate::tasks::Context;

/// Section name.
pub const SECTION: &str = "mounts";

/// Mount options used when the item does not set any.
pub const DEFAULT_OPTIONS: &str = "defaults";

/// Schedule `mount -o {options} -L {label} {path}` after creating `path`.
///
/// `path` defaults to the label.
///
/// # Errors
///
/// Returns [`crate::error::BuildError`] if `label` is missing or a key has
/// the wrong type.
pub fn process(ctx: &mut Context<'_>, item: &Item<'_>) -> Result<(), BootError> {
    let label = item.require_str("label")?.to_string();
    let options = item.str("options")?.unwrap_or(DEFAULT_OPTIONS).to_string();
    let path = item.str("path")?.unwrap_or(&label).to_string();

    let executor = Arc::clone(&ctx.executor);
    let fs_ops = Arc::clone(&ctx.fs_ops);
    ctx.task(format!("mount {label}"), move || {
        fs_ops.create_dir_all(&PathBuf::from(&path))?;
        executor.run("mount", &["-o", &options, "-L", &label, &path])?;
        Ok(())
    });
    Ok(())
}
