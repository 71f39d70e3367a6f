//! Rendering pipeline
//!
//! A repaint clears the page surface and draws every non-sticker annotation
//! of the page in store order, so calling it twice is harmless. Requests go
//! through [`RenderPipeline`], which stamps them with the generation of the
//! active page set and drops them if the pages changed before they ran.

use crate::hit::{self, ELLIPSE_SEGMENTS};
use crate::transform::TransformContext;
use annot_model::{Annotation, Bounds, Color, EditorSettings, PagePoint, ScreenPoint, StrokeKind};
use log::debug;
use std::collections::{HashMap, VecDeque};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

/// Drawing command in surface pixels (page-intrinsic units times zoom).
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Polyline { points: Vec<ScreenPoint>, color: Color, width: f32 },
    Rect { bounds: Bounds, color: Color, width: f32 },
    Ellipse { bounds: Bounds, color: Color, width: f32 },
    /// Filled, closed polygon.
    Polygon { points: Vec<ScreenPoint>, color: Color },
}

/// Raster target of one page.
pub trait Surface {
    /// Resizes if needed and clears to transparent.
    fn reset(&mut self, width: u32, height: u32);
    fn draw(&mut self, primitive: &Primitive);
}

/// Primitives for one annotation at `zoom`. Stickers yield nothing; the
/// sticker layer draws them.
pub fn primitives_for(
    annotation: &Annotation,
    zoom: f32,
    settings: &EditorSettings,
) -> Vec<Primitive> {
    let scale = |point: &PagePoint| ScreenPoint::new(point.x * zoom, point.y * zoom);
    let scale_bounds = |bounds: Bounds| Bounds {
        min_x: bounds.min_x * zoom,
        min_y: bounds.min_y * zoom,
        max_x: bounds.max_x * zoom,
        max_y: bounds.max_y * zoom,
    };
    let shape_width = settings.shape_width * zoom;

    match annotation {
        Annotation::Pencil(stroke) => vec![Primitive::Polyline {
            points: stroke.points.iter().map(scale).collect(),
            color: stroke.color,
            width: settings.stroke_width(StrokeKind::Pencil) * zoom,
        }],
        Annotation::Highlighter(stroke) => vec![Primitive::Polyline {
            points: stroke.points.iter().map(scale).collect(),
            color: stroke.color.with_alpha(settings.highlighter_opacity),
            width: settings.stroke_width(StrokeKind::Highlighter) * zoom,
        }],
        Annotation::Rect(shape) => vec![Primitive::Rect {
            bounds: scale_bounds(Bounds::from_corners(shape.start, shape.end)),
            color: shape.color,
            width: shape_width,
        }],
        Annotation::Circle(shape) => vec![Primitive::Ellipse {
            bounds: scale_bounds(Bounds::from_corners(shape.start, shape.end)),
            color: shape.color,
            width: shape_width,
        }],
        Annotation::Arrow(shape) => {
            let head = hit::arrow_head(shape.start, shape.end, settings.shape_width);
            vec![
                Primitive::Polyline {
                    points: vec![scale(&shape.start), scale(&shape.end)],
                    color: shape.color,
                    width: shape_width,
                },
                Primitive::Polygon { points: head.iter().map(scale).collect(), color: shape.color },
            ]
        }
        Annotation::Sticker(_) => Vec::new(),
    }
}

/// Full repaint of one page: reset, committed annotations, then the live
/// preview on top. Returns false when the page image is not loaded.
pub fn paint_page(
    surface: &mut dyn Surface,
    annotations: &[Annotation],
    preview: Option<&Annotation>,
    ctx: &TransformContext,
    settings: &EditorSettings,
) -> bool {
    let Some((width, height)) = ctx.surface_size() else {
        return false;
    };

    surface.reset(width, height);
    for annotation in annotations.iter().chain(preview) {
        for primitive in primitives_for(annotation, ctx.zoom, settings) {
            surface.draw(&primitive);
        }
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepaintReason {
    PageChanged,
    ZoomChanged,
    AnnotationsChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaintJob {
    pub page: u32,
    pub reason: RepaintReason,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintOutcome {
    Painted,
    /// The job's page is no longer displayed; nothing was drawn.
    Stale,
    /// The page image has not reported its size yet.
    NotReady,
}

/// Repaint queue for the displayed pages.
#[derive(Debug, Default)]
pub struct RenderPipeline {
    generation: u64,
    active: Vec<u32>,
    pending: HashMap<u32, (RepaintReason, u64)>,
    order: VecDeque<u32>,
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_pages(&self) -> &[u32] {
        &self.active
    }

    /// Switches the displayed pages. Pending work for the old pages is
    /// dropped and every new page is queued for a repaint.
    pub fn set_active_pages(&mut self, pages: &[u32]) {
        if self.active == pages {
            return;
        }

        self.generation += 1;
        self.pending.clear();
        self.order.clear();
        self.active = pages.to_vec();
        for page in pages {
            self.enqueue(*page, RepaintReason::PageChanged);
        }
    }

    pub fn invalidate(&mut self, page: u32, reason: RepaintReason) {
        if self.active.contains(&page) {
            self.enqueue(page, reason);
        }
    }

    pub fn invalidate_all(&mut self, reason: RepaintReason) {
        for page in self.active.clone() {
            self.enqueue(page, reason);
        }
    }

    fn enqueue(&mut self, page: u32, reason: RepaintReason) {
        if self.pending.contains_key(&page) {
            return;
        }

        self.pending.insert(page, (reason, self.generation));
        self.order.push_back(page);
    }

    pub fn pop_next(&mut self) -> Option<RepaintJob> {
        let page = self.order.pop_front()?;
        let (reason, generation) = self.pending.remove(&page)?;
        Some(RepaintJob { page, reason, generation })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_current(&self, job: &RepaintJob) -> bool {
        job.generation == self.generation && self.active.contains(&job.page)
    }

    /// Runs one job unless the page it targets stopped being displayed.
    pub fn paint(
        &self,
        job: &RepaintJob,
        surface: &mut dyn Surface,
        annotations: &[Annotation],
        preview: Option<&Annotation>,
        ctx: &TransformContext,
        settings: &EditorSettings,
    ) -> PaintOutcome {
        if !self.is_current(job) {
            debug!("dropping stale repaint of page {} (generation {})", job.page, job.generation);
            return PaintOutcome::Stale;
        }

        if paint_page(surface, annotations, preview, ctx, settings) {
            PaintOutcome::Painted
        } else {
            PaintOutcome::NotReady
        }
    }
}

/// tiny-skia backed surface.
#[derive(Debug, Default)]
pub struct RasterSurface {
    pixmap: Option<Pixmap>,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.pixmap.as_ref().map_or(0, Pixmap::width)
    }

    pub fn height(&self) -> u32 {
        self.pixmap.as_ref().map_or(0, Pixmap::height)
    }

    /// Straight (non-premultiplied) RGBA bytes, row-major.
    pub fn to_rgba(&self) -> Vec<u8> {
        let Some(pixmap) = &self.pixmap else {
            return Vec::new();
        };

        pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect()
    }

    /// Straight RGBA of one pixel, `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let pixel = self.pixmap.as_ref()?.pixel(x, y)?.demultiply();
        Some([pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()])
    }
}

fn paint_for(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn tiny_rect(bounds: Bounds) -> Option<Rect> {
    Rect::from_ltrb(bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y)
}

impl Surface for RasterSurface {
    fn reset(&mut self, width: u32, height: u32) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            if pixmap.width() == width && pixmap.height() == height {
                pixmap.fill(tiny_skia::Color::TRANSPARENT);
                return;
            }
        }
        self.pixmap = Pixmap::new(width, height);
    }

    fn draw(&mut self, primitive: &Primitive) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };

        match primitive {
            Primitive::Polyline { points, color, width } => {
                let Some((first, rest)) = points.split_first() else {
                    return;
                };
                let mut pb = PathBuilder::new();
                pb.move_to(first.x, first.y);
                if rest.is_empty() {
                    // single tap: round cap of a zero-length segment
                    pb.line_to(first.x + 0.01, first.y);
                }
                for point in rest {
                    pb.line_to(point.x, point.y);
                }
                let Some(path) = pb.finish() else {
                    return;
                };
                let stroke = Stroke {
                    width: *width,
                    line_cap: LineCap::Round,
                    line_join: LineJoin::Round,
                    ..Stroke::default()
                };
                pixmap.stroke_path(&path, &paint_for(*color), &stroke, Transform::identity(), None);
            }
            Primitive::Rect { bounds, color, width } => {
                let Some(rect) = tiny_rect(*bounds) else {
                    return;
                };
                let path = PathBuilder::from_rect(rect);
                let stroke = Stroke { width: *width, ..Stroke::default() };
                pixmap.stroke_path(&path, &paint_for(*color), &stroke, Transform::identity(), None);
            }
            Primitive::Ellipse { bounds, color, width } => {
                let path = match tiny_rect(*bounds).and_then(PathBuilder::from_oval) {
                    Some(path) => path,
                    None => {
                        // degenerate box: fall back to the sampled outline
                        let outline = hit::ellipse_outline(*bounds, ELLIPSE_SEGMENTS);
                        let mut pb = PathBuilder::new();
                        for (index, point) in outline.iter().enumerate() {
                            if index == 0 {
                                pb.move_to(point.x, point.y);
                            } else {
                                pb.line_to(point.x, point.y);
                            }
                        }
                        let Some(path) = pb.finish() else {
                            return;
                        };
                        path
                    }
                };
                let stroke = Stroke { width: *width, ..Stroke::default() };
                pixmap.stroke_path(&path, &paint_for(*color), &stroke, Transform::identity(), None);
            }
            Primitive::Polygon { points, color } => {
                let Some((first, rest)) = points.split_first() else {
                    return;
                };
                let mut pb = PathBuilder::new();
                pb.move_to(first.x, first.y);
                for point in rest {
                    pb.line_to(point.x, point.y);
                }
                pb.close();
                let Some(path) = pb.finish() else {
                    return;
                };
                let paint = paint_for(*color);
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annot_model::{AnnotationId, Shape, Sticker, StickerValue, Stroke};

    #[derive(Default)]
    struct RecordingSurface {
        resets: Vec<(u32, u32)>,
        drawn: Vec<Primitive>,
    }

    impl Surface for RecordingSurface {
        fn reset(&mut self, width: u32, height: u32) {
            self.resets.push((width, height));
            self.drawn.clear();
        }

        fn draw(&mut self, primitive: &Primitive) {
            self.drawn.push(primitive.clone());
        }
    }

    fn line(id: u64, color: Color) -> Annotation {
        Annotation::Pencil(Stroke {
            id: AnnotationId(id),
            color,
            points: vec![PagePoint::new(10.0, 10.0), PagePoint::new(90.0, 10.0)],
        })
    }

    fn page() -> Vec<Annotation> {
        vec![
            line(1, Color::RED),
            Annotation::Sticker(Sticker {
                id: AnnotationId(2),
                value: StickerValue::default(),
                x: 0.0,
                y: 0.0,
                size: 50.0,
            }),
            Annotation::Arrow(Shape {
                id: AnnotationId(3),
                color: Color::BLUE,
                start: PagePoint::new(0.0, 50.0),
                end: PagePoint::new(80.0, 50.0),
            }),
        ]
    }

    #[test]
    fn repaint_skips_stickers_and_scales_widths() {
        let settings = EditorSettings::default();
        let mut surface = RecordingSurface::default();
        let ctx = TransformContext::new(100.0, 80.0, 2.0);

        assert!(paint_page(&mut surface, &page(), None, &ctx, &settings));
        assert_eq!(surface.resets, vec![(200, 160)]);
        assert_eq!(surface.drawn.len(), 3);
        assert!(matches!(
            &surface.drawn[0],
            Primitive::Polyline { width, points, .. }
                if *width == 6.0 && points[1] == ScreenPoint::new(180.0, 20.0)
        ));
        assert!(matches!(
            &surface.drawn[2],
            Primitive::Polygon { points, .. } if points.len() == 3
        ));
    }

    #[test]
    fn repaint_is_idempotent() {
        let settings = EditorSettings::default();
        let ctx = TransformContext::new(100.0, 80.0, 1.0);
        let mut surface = RecordingSurface::default();

        paint_page(&mut surface, &page(), None, &ctx, &settings);
        let first = surface.drawn.clone();
        paint_page(&mut surface, &page(), None, &ctx, &settings);
        assert_eq!(surface.drawn, first);
    }

    #[test]
    fn highlighter_is_translucent_and_preview_draws_last() {
        let settings = EditorSettings::default();
        let highlight = Annotation::Highlighter(Stroke {
            id: AnnotationId(0),
            color: Color::YELLOW,
            points: vec![PagePoint::new(0.0, 0.0), PagePoint::new(5.0, 5.0)],
        });
        let mut surface = RecordingSurface::default();

        let ctx = TransformContext::new(10.0, 10.0, 1.0);
        paint_page(&mut surface, &[line(1, Color::RED)], Some(&highlight), &ctx, &settings);
        assert!(matches!(
            surface.drawn.last(),
            Some(Primitive::Polyline { color, width, .. }) if color.a == 89 && *width == 18.0
        ));
    }

    #[test]
    fn unloaded_page_is_not_painted() {
        let mut surface = RecordingSurface::default();
        let ctx = TransformContext::new(0.0, 0.0, 1.0);
        assert!(!paint_page(&mut surface, &page(), None, &ctx, &EditorSettings::default()));
        assert!(surface.resets.is_empty());
    }

    #[test]
    fn page_change_makes_queued_repaint_stale() {
        let settings = EditorSettings::default();
        let ctx = TransformContext::new(100.0, 80.0, 1.0);
        let mut pipeline = RenderPipeline::new();
        let mut surface = RecordingSurface::default();

        pipeline.set_active_pages(&[3]);
        let job = pipeline.pop_next().expect("repaint queued for new page");
        assert_eq!(job.reason, RepaintReason::PageChanged);

        pipeline.set_active_pages(&[4, 5]);
        let outcome = pipeline.paint(&job, &mut surface, &page(), None, &ctx, &settings);
        assert_eq!(outcome, PaintOutcome::Stale);
        assert!(surface.resets.is_empty());

        let next = pipeline.pop_next().expect("repaint queued for page 4");
        let outcome = pipeline.paint(&next, &mut surface, &page(), None, &ctx, &settings);
        assert_eq!(outcome, PaintOutcome::Painted);
    }

    #[test]
    fn invalidations_coalesce_per_page() {
        let mut pipeline = RenderPipeline::new();
        pipeline.set_active_pages(&[1, 2]);
        while pipeline.pop_next().is_some() {}

        pipeline.invalidate(2, RepaintReason::AnnotationsChanged);
        pipeline.invalidate(2, RepaintReason::AnnotationsChanged);
        pipeline.invalidate(9, RepaintReason::AnnotationsChanged);
        assert_eq!(pipeline.len(), 1);

        pipeline.invalidate_all(RepaintReason::ZoomChanged);
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.pop_next().map(|job| job.page), Some(2));
        assert_eq!(pipeline.pop_next().map(|job| job.page), Some(1));
        assert!(pipeline.is_empty());
    }

    #[test]
    fn raster_surface_paints_stroke_pixels() {
        let settings = EditorSettings::default();
        let mut surface = RasterSurface::new();
        let ctx = TransformContext::new(100.0, 80.0, 1.0);

        assert!(paint_page(&mut surface, &[line(1, Color::rgb(255, 0, 0))], None, &ctx, &settings));
        assert_eq!((surface.width(), surface.height()), (100, 80));
        assert_eq!(surface.pixel(50, 10), Some([255, 0, 0, 255]));
        assert_eq!(surface.pixel(50, 40).map(|p| p[3]), Some(0));
        assert_eq!(surface.to_rgba().len(), 100 * 80 * 4);

        paint_page(&mut surface, &[], None, &ctx, &settings);
        assert_eq!(surface.pixel(50, 10).map(|p| p[3]), Some(0));
    }
}
