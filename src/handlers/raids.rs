//! `raids`: software RAID arrays managed with `mdadm`.
//!
//! First boot creates the array; later boots assemble it from its drives.
use std::sync::Arc;

use super::{block_device_tasks, require_format_tools};
use crate::config::Item;
use crate::error::{BootError, BuildError};
use crate::tasks::Context;

/// Section name.
pub const SECTION: &str = "raids";

/// Level used when the item does not set one.
pub const DEFAULT_LEVEL: &str = "0";

/// Schedule creation or assembly, then the shared block device tasks.
///
/// # Errors
///
/// Returns [`BuildError::MissingField`] if `device` or `drives` is missing
/// and [`BuildError::InvalidValue`] for mistyped keys.
pub fn process(ctx: &mut Context<'_>, item: &Item<'_>) -> Result<(), BootError> {
    let device = item.require_str("device")?;
    let drives = item.strings("drives")?;
    if drives.is_empty() {
        return Err(BuildError::MissingField {
            section: SECTION.to_string(),
            field: "drives".to_string(),
        }
        .into());
    }
    let level = item.str("level")?.unwrap_or(DEFAULT_LEVEL);

    ctx.require_package("mdadm");
    require_format_tools(ctx, item)?;

    let executor = Arc::clone(&ctx.executor);
    let mut args: Vec<String> = Vec::new();
    if ctx.is_init() {
        args.extend([
            "--create".to_string(),
            device.to_string(),
            "--run".to_string(),
            format!("--level={level}"),
            format!("--raid-devices={}", drives.len()),
        ]);
        args.extend(drives.iter().map(ToString::to_string));
        ctx.init_task(format!("create raid {device}"), move || {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            executor.run("mdadm", &args)?;
            Ok(())
        });
    } else {
        args.extend(["--assemble".to_string(), device.to_string()]);
        args.extend(drives.iter().map(ToString::to_string));
        ctx.task(format!("assemble raid {device}"), move || {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            executor.run("mdadm", &args)?;
            Ok(())
        });
    }

    block_device_tasks(ctx, item, device)?;
    Ok(())
}
