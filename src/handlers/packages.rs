//! `packages`: system packages installed with apt in a single task.
use crate::error::BootError;
use crate::tasks::Context;

/// Section name.
pub const SECTION: &str = "packages";

/// Queue the section's packages; the install task is registered here when
/// the list is non-empty, or later by the first handler requiring one.
///
/// # Errors
///
/// Returns [`crate::error::BuildError::InvalidValue`] if an entry is not a
/// package name.
pub fn process(ctx: &mut Context<'_>) -> Result<(), BootError> {
    let names = ctx.config.section(SECTION).strings()?;
    ctx.queue_packages(&names);
    Ok(())
}
