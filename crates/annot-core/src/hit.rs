//! Hit geometry shared by the eraser, the sticker layer and the renderer.

use annot_model::{Annotation, Bounds, PagePoint};

/// Segment count used to approximate ellipse outlines.
pub const ELLIPSE_SEGMENTS: usize = 48;

pub fn distance_to_segment(point: PagePoint, start: PagePoint, end: PagePoint) -> f32 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-6 {
        return point.distance_to(&start);
    }

    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
    point.distance_to(&PagePoint::new(start.x + t * dx, start.y + t * dy))
}

fn polyline_within(points: &[PagePoint], center: PagePoint, radius: f32) -> bool {
    match points {
        [] => false,
        [single] => single.distance_to(&center) <= radius,
        _ => points.windows(2).any(|pair| distance_to_segment(center, pair[0], pair[1]) <= radius),
    }
}

/// Closed outline of the ellipse inscribed in `bounds`.
pub fn ellipse_outline(bounds: Bounds, segments: usize) -> Vec<PagePoint> {
    let segments = segments.max(3);
    let cx = (bounds.min_x + bounds.max_x) / 2.0;
    let cy = (bounds.min_y + bounds.max_y) / 2.0;
    let rx = bounds.width() / 2.0;
    let ry = bounds.height() / 2.0;

    (0..=segments)
        .map(|i| {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            PagePoint::new(cx + rx * angle.cos(), cy + ry * angle.sin())
        })
        .collect()
}

pub fn rect_outline(bounds: Bounds) -> [PagePoint; 5] {
    [
        PagePoint::new(bounds.min_x, bounds.min_y),
        PagePoint::new(bounds.max_x, bounds.min_y),
        PagePoint::new(bounds.max_x, bounds.max_y),
        PagePoint::new(bounds.min_x, bounds.max_y),
        PagePoint::new(bounds.min_x, bounds.min_y),
    ]
}

/// Triangle of an arrow head pointing at `end`: tip, left, right.
pub fn arrow_head(start: PagePoint, end: PagePoint, stroke_width: f32) -> [PagePoint; 3] {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length = (dx * dx + dy * dy).sqrt().max(1.0);
    let ux = dx / length;
    let uy = dy / length;
    let head_len = (stroke_width * 4.0).max(12.0);
    let head_half = head_len * 0.6;

    let base_x = end.x - ux * head_len;
    let base_y = end.y - uy * head_len;

    [
        end,
        PagePoint::new(base_x - uy * head_half, base_y + ux * head_half),
        PagePoint::new(base_x + uy * head_half, base_y - ux * head_half),
    ]
}

fn square_within(bounds: Bounds, center: PagePoint, radius: f32) -> bool {
    let nearest = PagePoint::new(
        center.x.clamp(bounds.min_x, bounds.max_x),
        center.y.clamp(bounds.min_y, bounds.max_y),
    );
    nearest.distance_to(&center) <= radius
}

/// Whether the drawn geometry of `annotation` touches the circle at `center`.
///
/// Outlines count, interiors of rectangles and ellipses do not; stickers are
/// solid squares.
pub fn intersects_circle(annotation: &Annotation, center: PagePoint, radius: f32) -> bool {
    match annotation {
        Annotation::Pencil(stroke) | Annotation::Highlighter(stroke) => {
            polyline_within(&stroke.points, center, radius)
        }
        Annotation::Rect(shape) => {
            let outline = rect_outline(Bounds::from_corners(shape.start, shape.end));
            polyline_within(&outline, center, radius)
        }
        Annotation::Circle(shape) => {
            let bounds = Bounds::from_corners(shape.start, shape.end);
            let outline = ellipse_outline(bounds, ELLIPSE_SEGMENTS);
            polyline_within(&outline, center, radius)
        }
        Annotation::Arrow(shape) => {
            if distance_to_segment(center, shape.start, shape.end) <= radius {
                return true;
            }
            let [tip, left, right] = arrow_head(shape.start, shape.end, 0.0);
            polyline_within(&[tip, left, right, tip], center, radius)
        }
        Annotation::Sticker(sticker) => square_within(sticker.bounds(), center, radius),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annot_model::{AnnotationId, Color, Shape, Sticker, StickerValue, Stroke};

    fn stroke(points: &[(f32, f32)]) -> Annotation {
        Annotation::Pencil(Stroke {
            id: AnnotationId(1),
            color: Color::RED,
            points: points.iter().map(|(x, y)| PagePoint::new(*x, *y)).collect(),
        })
    }

    fn shape(kind: fn(Shape) -> Annotation, start: (f32, f32), end: (f32, f32)) -> Annotation {
        kind(Shape {
            id: AnnotationId(2),
            color: Color::BLUE,
            start: PagePoint::new(start.0, start.1),
            end: PagePoint::new(end.0, end.1),
        })
    }

    #[test]
    fn segment_distance_projects_and_clamps() {
        let a = PagePoint::new(0.0, 0.0);
        let b = PagePoint::new(10.0, 0.0);
        assert!((distance_to_segment(PagePoint::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-4);
        assert!((distance_to_segment(PagePoint::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-4);
        assert!((distance_to_segment(PagePoint::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn stroke_hit_uses_segments_not_just_vertices() {
        let line = stroke(&[(0.0, 0.0), (100.0, 0.0)]);
        assert!(intersects_circle(&line, PagePoint::new(50.0, 5.0), 6.0));
        assert!(!intersects_circle(&line, PagePoint::new(50.0, 20.0), 6.0));

        let dot = stroke(&[(10.0, 10.0)]);
        assert!(intersects_circle(&dot, PagePoint::new(12.0, 10.0), 3.0));
    }

    #[test]
    fn rect_interior_is_not_a_hit() {
        let rect = shape(Annotation::Rect, (0.0, 0.0), (100.0, 100.0));
        assert!(intersects_circle(&rect, PagePoint::new(98.0, 50.0), 4.0));
        assert!(!intersects_circle(&rect, PagePoint::new(50.0, 50.0), 4.0));
    }

    #[test]
    fn circle_outline_is_inscribed_in_box() {
        let circle = shape(Annotation::Circle, (0.0, 0.0), (100.0, 50.0));
        assert!(intersects_circle(&circle, PagePoint::new(100.0, 25.0), 2.0));
        assert!(intersects_circle(&circle, PagePoint::new(50.0, 0.0), 2.0));
        assert!(!intersects_circle(&circle, PagePoint::new(50.0, 25.0), 5.0));
        assert!(!intersects_circle(&circle, PagePoint::new(0.0, 0.0), 5.0));
    }

    #[test]
    fn arrow_hits_shaft_and_head() {
        let arrow = shape(Annotation::Arrow, (0.0, 0.0), (100.0, 0.0));
        assert!(intersects_circle(&arrow, PagePoint::new(40.0, 1.0), 2.0));

        let [_, left, _] = arrow_head(PagePoint::new(0.0, 0.0), PagePoint::new(100.0, 0.0), 0.0);
        assert!(intersects_circle(&arrow, left, 1.0));
        assert!(!intersects_circle(&arrow, PagePoint::new(40.0, 30.0), 2.0));
    }

    #[test]
    fn sticker_is_solid_square() {
        let sticker = Annotation::Sticker(Sticker {
            id: AnnotationId(3),
            value: StickerValue::default(),
            x: 10.0,
            y: 10.0,
            size: 40.0,
        });
        assert!(intersects_circle(&sticker, PagePoint::new(30.0, 30.0), 1.0));
        assert!(intersects_circle(&sticker, PagePoint::new(55.0, 30.0), 6.0));
        assert!(!intersects_circle(&sticker, PagePoint::new(60.0, 60.0), 6.0));
    }

    #[test]
    fn arrow_head_points_back_along_shaft() {
        let [tip, left, right] =
            arrow_head(PagePoint::new(0.0, 0.0), PagePoint::new(100.0, 0.0), 3.0);
        assert_eq!(tip, PagePoint::new(100.0, 0.0));
        assert!(left.x < 100.0 && right.x < 100.0);
        assert!((left.y + right.y).abs() < 1e-4);
    }
}
