//! `volumes`: attached block devices.
//!
//! Every boot waits for the device node to appear; first boot also
//! formats it when `format` is set.
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};

use super::{block_device_tasks, require_format_tools};
use crate::config::Item;
use crate::error::BootError;
use crate::operations::FileSystemOps;
use crate::tasks::Context;

/// Section name.
pub const SECTION: &str = "volumes";

/// Number of times the device path is checked before giving up.
pub const WAIT_ATTEMPTS: u32 = 300;

/// Delay between checks.
pub const WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Schedule the wait, scheduler and format tasks for one volume.
///
/// # Errors
///
/// Returns [`crate::error::BuildError`] if `device` is missing or a key has
/// the wrong type.
pub fn process(ctx: &mut Context<'_>, item: &Item<'_>) -> Result<(), BootError> {
    let device = item.require_str("device")?;
    require_format_tools(ctx, item)?;

    let fs_ops = Arc::clone(&ctx.fs_ops);
    let path = device.to_string();
    ctx.task(format!("wait for volume {device}"), move || {
        wait_for_path(fs_ops.as_ref(), Path::new(&path), WAIT_ATTEMPTS, WAIT_INTERVAL)
    });

    block_device_tasks(ctx, item, device)?;
    Ok(())
}

/// Poll until `path` exists, checking up to `attempts` times.
///
/// # Errors
///
/// Returns an error if the path is still missing after the last attempt.
pub fn wait_for_path(
    fs_ops: &dyn FileSystemOps,
    path: &Path,
    attempts: u32,
    interval: Duration,
) -> Result<()> {
    for attempt in 1..=attempts {
        if fs_ops.exists(path) {
            return Ok(());
        }
        tracing::debug!(
            "waiting for {} ({attempt}/{attempts})",
            path.display()
        );
        if attempt < attempts {
            std::thread::sleep(interval);
        }
    }
    bail!("{} did not appear after {attempts} checks", path.display())
}
