//! `users`: SSH authorized keys for existing accounts.
use std::sync::Arc;

use super::shell_quote;
use crate::config::Item;
use crate::error::BootError;
use crate::tasks::Context;

/// Section name.
pub const SECTION: &str = "users";

/// Schedule one task per authorized key, appending it as the user.
///
/// # Errors
///
/// Returns [`crate::error::BuildError`] if `name` is missing or
/// `authorized_keys` is not a list of strings.
pub fn process(ctx: &mut Context<'_>, item: &Item<'_>) -> Result<(), BootError> {
    let name = item.require_str("name")?;
    for key in item.strings("authorized_keys")? {
        let executor = Arc::clone(&ctx.executor);
        let user = name.to_string();
        let script = append_key_script(key);
        ctx.task(format!("add authorized_key for user {name}"), move || {
            executor.run("su", &["-", &user, "-c", &script])?;
            Ok(())
        });
    }
    Ok(())
}

fn append_key_script(key: &str) -> String {
    format!(
        "mkdir -p .ssh && echo {} >> .ssh/authorized_keys && chmod 700 .ssh && chmod 600 .ssh/authorized_keys",
        shell_quote(key)
    )
}
