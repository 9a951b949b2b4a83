//! `render` subcommand — draw one icon through the render surface and save it as PNG.

use std::path::Path;

use clockglyph_lib::coordinator::DrawCoordinator;
use clockglyph_lib::render::{Align, RenderRequest};
use clockglyph_lib::surface::OffscreenSurface;

use super::{CliContext, IconSpec, RenderOutput, Result, print_json};

pub(super) fn cmd_render(
    ctx: &CliContext,
    text: Option<String>,
    color: Option<String>,
    align: Option<Align>,
    output: &Path,
) -> Result<()> {
    let settings = ctx.load();
    let now = chrono::Local::now().naive_local();
    let spec = IconSpec::for_time(ctx.mode, &settings, now);

    let text = text.unwrap_or(spec.text);
    let color = color.unwrap_or(spec.color);
    let request = RenderRequest {
        cache_key: format!("{text}|{color}|{}", ctx.mode),
        text,
        color,
        align: align.unwrap_or(ctx.mode.align()),
    };

    let coordinator = DrawCoordinator::new(OffscreenSurface::default());
    let bitmap = coordinator.draw(request.clone())?;
    bitmap.save_png(output)?;

    if ctx.json {
        return print_json(&RenderOutput {
            output: output.display().to_string(),
            text: request.text,
            color: request.color,
            cache_key: request.cache_key,
            width: bitmap.width(),
            height: bitmap.height(),
        });
    }
    println!(
        "Rendered \"{}\" in {} ({}x{}) -> {}",
        request.text,
        request.color,
        bitmap.width(),
        bitmap.height(),
        output.display()
    );
    Ok(())
}
