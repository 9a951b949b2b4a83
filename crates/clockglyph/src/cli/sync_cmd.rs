//! `sync` subcommand — push the full settings record to the companion icon.

use clockglyph_lib::sync;

use super::{CliContext, Result, print_json};

#[derive(serde::Serialize)]
struct SyncOutput {
    companion: String,
    delivered: bool,
}

pub(super) fn cmd_sync(ctx: &CliContext) -> Result<()> {
    let settings = ctx.load();
    let addr = sync::companion_addr(ctx.mode);
    sync::send_to_companion(addr, &settings.to_patch())?;

    if ctx.json {
        return print_json(&SyncOutput {
            companion: addr.to_string(),
            delivered: true,
        });
    }
    println!("Settings sent to the {} icon ({addr}).", ctx.mode.companion());
    Ok(())
}
