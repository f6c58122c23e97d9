//! `gems`: Ruby gems installed one task per gem.
use std::sync::Arc;

use super::item_name;
use crate::config::Item;
use crate::error::BootError;
use crate::tasks::Context;

/// Section name.
pub const SECTION: &str = "gems";

/// Schedule `gem install {name}`.
///
/// # Errors
///
/// Returns [`crate::error::BuildError`] if the item has no name.
pub fn process(ctx: &mut Context<'_>, item: &Item<'_>) -> Result<(), BootError> {
    let name = item_name(item)?.to_string();
    let executor = Arc::clone(&ctx.executor);
    ctx.task(format!("install gem {name}"), move || {
        executor.run("gem", &["install", &name, "--no-rdoc", "--no-ri"])?;
        Ok(())
    });
    Ok(())
}
