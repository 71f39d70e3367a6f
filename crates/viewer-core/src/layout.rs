use annot_core::TransformContext;
use annot_model::{PageSize, ScreenPoint};

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.25;

/// Snaps `zoom` to the nearest ladder step inside `[MIN_ZOOM, MAX_ZOOM]`.
pub fn clamp_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return 1.0;
    }

    ((zoom / ZOOM_STEP).round() * ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM)
}

pub fn zoom_in(zoom: f32) -> f32 {
    clamp_zoom(clamp_zoom(zoom) + ZOOM_STEP)
}

pub fn zoom_out(zoom: f32) -> f32 {
    clamp_zoom(clamp_zoom(zoom) - ZOOM_STEP)
}

/// Where one visible page sits in container space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub page: u32,
    pub ctx: TransformContext,
}

/// Lays the visible pages out left to right, `gap` screen pixels apart.
/// Pages whose size is still unknown take no width.
pub fn layout_pages(pages: &[(u32, Option<PageSize>)], zoom: f32, gap: f32) -> Vec<PagePlacement> {
    let mut cursor = 0.0;

    pages
        .iter()
        .map(|(page, size)| {
            let size = size.unwrap_or_default();
            let origin = ScreenPoint::new(cursor, 0.0);
            let ctx = TransformContext::for_page(size, zoom).with_origin(origin);
            if size.is_known() {
                cursor += size.width * zoom + gap;
            }
            PagePlacement { page: *page, ctx }
        })
        .collect()
}

/// Page under a container-space point.
pub fn page_at(placements: &[PagePlacement], point: ScreenPoint) -> Option<&PagePlacement> {
    placements.iter().find(|placement| placement.ctx.contains(point))
}
