//! Hook scripts: inline bodies or named scripts fetched from the layers.
//!
//! A hook value is a script or a list of scripts.  An entry starting with
//! `#!` is an inline script body; anything else names `/scripts/{name}`.
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use super::Context;
use crate::error::{BootError, BuildError};

/// Marker that makes a hook entry an inline script.
const SHEBANG: &str = "#!";

/// Schedule a task for every script in a hook value.
///
/// `owner` is the section (or `global`) the hook belongs to and only
/// appears in error messages.  An absent or null value schedules nothing.
///
/// # Errors
///
/// Returns [`BuildError::InvalidValue`] if the value or one of its entries
/// is not a string, [`crate::error::AssetError::Staging`] if an inline body
/// cannot be written, and fatal fetch errors from named scripts.
pub fn run_scripts(
    ctx: &mut Context<'_>,
    owner: &str,
    hook: &str,
    value: Option<&Value>,
) -> Result<(), BootError> {
    let invalid = |found: &Value| BuildError::InvalidValue {
        section: owner.to_string(),
        field: hook.to_string(),
        reason: format!("expected a script or a list of scripts, got {found}"),
    };
    let entries: Vec<&str> = match value {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::String(script)) => vec![script.as_str()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().ok_or_else(|| invalid(v)))
            .collect::<Result<_, _>>()?,
        Some(other) => return Err(invalid(other).into()),
    };
    for entry in entries {
        run_script(ctx, entry)?;
    }
    Ok(())
}

fn run_script(ctx: &mut Context<'_>, script: &str) -> Result<(), BootError> {
    if script.starts_with(SHEBANG) {
        let staged = ctx.assets.staging().put_inline(script.as_bytes())?;
        schedule(ctx, "run inline script".to_string(), staged);
        return Ok(());
    }
    let name = script.to_string();
    ctx.fetch_script(script, move |ctx, staged| {
        schedule(ctx, format!("run script {name}"), staged);
        Ok(())
    })
}

fn schedule(ctx: &mut Context<'_>, description: String, staged: PathBuf) {
    let executor = Arc::clone(&ctx.executor);
    ctx.task(description, move || {
        executor.run_file(&staged)?;
        Ok(())
    });
}
