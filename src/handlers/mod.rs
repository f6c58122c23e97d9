//! Section handlers: one module per provisioning concern.
//!
//! Each handler turns its section into tasks through the [`Context`]
//! helpers.  [`default_registry`] fixes the order sections are processed in.
pub mod crontab;
pub mod files;
pub mod gems;
pub mod local_packages;
pub mod mounts;
pub mod packages;
pub mod raids;
pub mod users;
pub mod volumes;

use crate::config::Item;
use crate::error::BuildError;
use crate::tasks::{Context, Handler, Registry};

/// The built-in handlers in processing order.
#[must_use]
pub fn default_registry() -> Registry {
    Registry::new()
        .with(packages::SECTION, Handler::Singleton(packages::process))
        .with(local_packages::SECTION, Handler::PerItem(local_packages::process))
        .with(gems::SECTION, Handler::PerItem(gems::process))
        .with(volumes::SECTION, Handler::PerItem(volumes::process))
        .with(raids::SECTION, Handler::PerItem(raids::process))
        .with(mounts::SECTION, Handler::PerItem(mounts::process))
        .with(files::SECTION, Handler::PerItem(files::process))
        .with(users::SECTION, Handler::PerItem(users::process))
        .with(crontab::SECTION, Handler::PerItem(crontab::process))
}

/// Name of an item that is either a bare string or a mapping with `name`.
pub(crate) fn item_name<'a>(item: &Item<'a>) -> Result<&'a str, BuildError> {
    match item.as_str() {
        Some(name) => Ok(name),
        None => item.require_str("name"),
    }
}

/// Quote `s` for inclusion in a POSIX shell command line.
pub(crate) fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Last path component of `path`.
pub(crate) fn basename(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}

/// Tasks shared by block devices: I/O scheduler and first-boot format.
///
/// `xfsprogs` is required before any task is registered so the package
/// install always precedes the format.
pub(crate) fn block_device_tasks(
    ctx: &mut Context<'_>,
    item: &Item<'_>,
    device: &str,
) -> Result<(), BuildError> {
    if let Some(scheduler) = item.str("scheduler")? {
        ctx.shell_task(
            format!("set scheduler for {device}"),
            format!(
                "echo {} > /sys/block/{}/queue/scheduler",
                shell_quote(scheduler),
                basename(device)
            ),
        );
    }
    if let Some(format) = item.str("format")? {
        let executor = std::sync::Arc::clone(&ctx.executor);
        let program = format!("mkfs.{format}");
        let device = device.to_string();
        ctx.init_task(format!("format {device}"), move || {
            executor.run(&program, &[&device])?;
            Ok(())
        });
    }
    Ok(())
}

/// Require `xfsprogs` when the item formats with xfs.
pub(crate) fn require_format_tools(
    ctx: &mut Context<'_>,
    item: &Item<'_>,
) -> Result<(), BuildError> {
    if item.str("format")? == Some("xfs") {
        ctx.require_package("xfsprogs");
    }
    Ok(())
}
