//! `crontab`: per-user crontabs from static files or templates.
use std::sync::Arc;

use crate::config::Item;
use crate::error::{BootError, BuildError};
use crate::tasks::Context;

/// Section name.
pub const SECTION: &str = "crontab";

/// User whose crontab is installed when the item does not name one.
pub const DEFAULT_USER: &str = "root";

/// Fetch the crontab and schedule `crontab -u {user} {staged}`.
///
/// `template` renders `/templates/{template}`; otherwise `source` (or
/// `file`) names `/files/{name}`.
///
/// # Errors
///
/// Returns [`BuildError::MissingField`] if none of `template`, `source`
/// or `file` is set, and fatal fetch or render errors.
pub fn process(ctx: &mut Context<'_>, item: &Item<'_>) -> Result<(), BootError> {
    let user = item.str("user")?.unwrap_or(DEFAULT_USER).to_string();
    let install = move |ctx: &mut Context<'_>, staged: std::path::PathBuf| -> Result<(), BootError> {
        let executor = Arc::clone(&ctx.executor);
        ctx.task(format!("install crontab for {user}"), move || {
            executor.run("crontab", &["-u", &user, &staged.to_string_lossy()])?;
            Ok(())
        });
        Ok(())
    };

    if let Some(template) = item.str("template")? {
        return ctx.fetch_template(template, install);
    }
    let name = match item.str("source")? {
        Some(source) => source,
        None => item.str("file")?.ok_or_else(|| BuildError::MissingField {
            section: SECTION.to_string(),
            field: "file".to_string(),
        })?,
    };
    ctx.fetch_file(&format!("/files/{name}"), install)
}
