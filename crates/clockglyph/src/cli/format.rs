//! `format` subcommand — 12/24-hour clock and leading zero.

use super::{CliContext, Result, report_change};

pub(super) fn cmd_format(
    ctx: &CliContext,
    use_24_hour_format: Option<bool>,
    show_leading_zero: Option<bool>,
) -> Result<()> {
    let mut settings = ctx.load();
    let before = settings.clone();
    if let Some(v) = use_24_hour_format {
        settings.use_24_hour_format = v;
    }
    if let Some(v) = show_leading_zero {
        settings.show_leading_zero = v;
    }
    let changed = settings != before;
    if changed {
        ctx.save(&settings)?;
    }
    report_change(ctx, changed, &settings)
}
