//! `local_packages`: `.deb` files served from the config layers.
use std::sync::Arc;

use super::item_name;
use crate::config::Item;
use crate::error::BootError;
use crate::tasks::Context;

/// Section name.
pub const SECTION: &str = "local_packages";

/// Fetch `/packages/{name}_{arch}.deb` and install it with `dpkg`.
///
/// # Errors
///
/// Returns [`crate::error::BuildError`] if the item has no name, and fatal
/// fetch errors.
pub fn process(ctx: &mut Context<'_>, item: &Item<'_>) -> Result<(), BootError> {
    let name = item_name(item)?;
    let description = format!("install local package {name}");
    ctx.fetch_package(name, move |ctx, staged| {
        let executor = Arc::clone(&ctx.executor);
        ctx.task(description, move || {
            executor.run("dpkg", &["-i", &staged.to_string_lossy()])?;
            Ok(())
        });
        Ok(())
    })
}
