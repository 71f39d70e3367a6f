use crate::annotation::{StickerValue, StrokeKind};
use crate::geometry::{PagePoint, PageSize};
use serde::{Deserialize, Serialize};

/// Where a sticker picked from the toolbar lands when it is placed without
/// a click.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StickerAnchor {
    #[default]
    PageCenter,
    Point {
        x: f32,
        y: f32,
    },
}

impl StickerAnchor {
    pub fn resolve(&self, page: PageSize) -> PagePoint {
        match *self {
            Self::PageCenter => page.center(),
            Self::Point { x, y } => PagePoint::new(x, y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// Flush to the sink after every committed change.
    #[default]
    Immediate,
    /// Flush only when the host asks for it.
    Manual,
}

/// Tunables of the annotation editor. Widths, radii and sizes are in
/// page-intrinsic units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub pencil_width: f32,
    pub highlighter_width: f32,
    pub highlighter_opacity: f32,
    pub shape_width: f32,
    pub eraser_radius: f32,
    pub sticker_size: f32,
    pub sticker_min_size: f32,
    pub sticker_max_size: f32,
    pub default_sticker: StickerValue,
    pub sticker_anchor: StickerAnchor,
    pub flip_duration_ms: u64,
    pub history_limit: usize,
    pub save_policy: SavePolicy,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            pencil_width: 3.0,
            highlighter_width: 18.0,
            highlighter_opacity: 0.35,
            shape_width: 3.0,
            eraser_radius: 12.0,
            sticker_size: 64.0,
            sticker_min_size: 24.0,
            sticker_max_size: 200.0,
            default_sticker: StickerValue::default(),
            sticker_anchor: StickerAnchor::PageCenter,
            flip_duration_ms: 600,
            history_limit: 100,
            save_policy: SavePolicy::Immediate,
        }
    }
}

impl EditorSettings {
    pub fn stroke_width(&self, kind: StrokeKind) -> f32 {
        match kind {
            StrokeKind::Pencil => self.pencil_width,
            StrokeKind::Highlighter => self.highlighter_width,
        }
    }

    pub fn clamp_sticker_size(&self, size: f32) -> f32 {
        let max = self.sticker_max_size.max(self.sticker_min_size);
        if size.is_nan() {
            return self.sticker_size.clamp(self.sticker_min_size, max);
        }
        size.clamp(self.sticker_min_size, max)
    }
}
