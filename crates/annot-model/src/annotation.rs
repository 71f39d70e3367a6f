//! Annotation records
//!
//! All geometry is stored in page-intrinsic coordinates so it survives zoom
//! changes and viewport resizes unchanged. Only rendering applies zoom.

use crate::geometry::{Bounds, PagePoint};
use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Book-unique annotation identifier.
///
/// Unique across every page of a book, so update and remove can address an
/// annotation without also naming its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// RGBA color, serialized as a CSS hex string (`#rrggbb` or `#rrggbbaa`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const RED: Color = Color { r: 229, g: 62, b: 62, a: 255 };
    pub const BLUE: Color = Color { r: 49, g: 130, b: 206, a: 255 };
    pub const GREEN: Color = Color { r: 56, g: 161, b: 105, a: 255 };
    pub const YELLOW: Color = Color { r: 250, g: 204, b: 21, a: 255 };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        let a = (self.a as f32 * alpha.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::RED
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidColor(value.to_owned());
        let hex = value.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |index: usize| {
            u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16).map_err(|_| invalid())
        };
        let short = |index: usize| {
            u8::from_str_radix(&hex[index..index + 1], 16).map(|v| v * 17).map_err(|_| invalid())
        };

        match hex.len() {
            3 => Ok(Self::rgb(short(0)?, short(1)?, short(2)?)),
            6 => Ok(Self::rgb(channel(0)?, channel(1)?, channel(2)?)),
            8 => Ok(Self { r: channel(0)?, g: channel(1)?, b: channel(2)?, a: channel(3)? }),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// Active editing tool selected in the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    None,
    Pencil,
    Highlighter,
    Rect,
    Circle,
    Arrow,
    Eraser,
    Sticker,
}

impl Tool {
    pub fn stroke_kind(self) -> Option<StrokeKind> {
        match self {
            Self::Pencil => Some(StrokeKind::Pencil),
            Self::Highlighter => Some(StrokeKind::Highlighter),
            _ => None,
        }
    }

    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            Self::Rect => Some(ShapeKind::Rect),
            Self::Circle => Some(ShapeKind::Circle),
            Self::Arrow => Some(ShapeKind::Arrow),
            _ => None,
        }
    }

    /// Tools that paint onto the raster surface and therefore take pointer
    /// events before the sticker overlay does.
    pub fn paints(self) -> bool {
        self.stroke_kind().is_some() || self.shape_kind().is_some() || self == Self::Eraser
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrokeKind {
    Pencil,
    Highlighter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rect,
    Circle,
    Arrow,
}

/// Freehand pencil or highlighter mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: AnnotationId,
    pub color: Color,
    pub points: Vec<PagePoint>,
}

/// Rectangle, circle or arrow between an anchor and an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: AnnotationId,
    pub color: Color,
    pub start: PagePoint,
    pub end: PagePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickerValue {
    Emoji(String),
    Icon(String),
}

impl Default for StickerValue {
    fn default() -> Self {
        Self::Emoji("\u{2b50}".to_owned())
    }
}

impl fmt::Display for StickerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emoji(glyph) => f.write_str(glyph),
            Self::Icon(src) => write!(f, "icon:{src}"),
        }
    }
}

/// Square sticker; `x`/`y` is the top-left corner and `size` the edge length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    pub id: AnnotationId,
    pub value: StickerValue,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

impl Sticker {
    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_x: self.x,
            min_y: self.y,
            max_x: self.x + self.size,
            max_y: self.y + self.size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    Pencil(Stroke),
    Highlighter(Stroke),
    Rect(Shape),
    Circle(Shape),
    Arrow(Shape),
    Sticker(Sticker),
}

impl Annotation {
    pub fn stroke(kind: StrokeKind, stroke: Stroke) -> Self {
        match kind {
            StrokeKind::Pencil => Self::Pencil(stroke),
            StrokeKind::Highlighter => Self::Highlighter(stroke),
        }
    }

    pub fn shape(kind: ShapeKind, shape: Shape) -> Self {
        match kind {
            ShapeKind::Rect => Self::Rect(shape),
            ShapeKind::Circle => Self::Circle(shape),
            ShapeKind::Arrow => Self::Arrow(shape),
        }
    }

    pub fn id(&self) -> AnnotationId {
        match self {
            Self::Pencil(stroke) | Self::Highlighter(stroke) => stroke.id,
            Self::Rect(shape) | Self::Circle(shape) | Self::Arrow(shape) => shape.id,
            Self::Sticker(sticker) => sticker.id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Pencil(_) => "pencil",
            Self::Highlighter(_) => "highlighter",
            Self::Rect(_) => "rect",
            Self::Circle(_) => "circle",
            Self::Arrow(_) => "arrow",
            Self::Sticker(_) => "sticker",
        }
    }

    /// Color for drawable types; stickers carry none.
    pub fn color(&self) -> Option<Color> {
        match self {
            Self::Pencil(stroke) | Self::Highlighter(stroke) => Some(stroke.color),
            Self::Rect(shape) | Self::Circle(shape) | Self::Arrow(shape) => Some(shape.color),
            Self::Sticker(_) => None,
        }
    }

    pub fn as_sticker(&self) -> Option<&Sticker> {
        match self {
            Self::Sticker(sticker) => Some(sticker),
            _ => None,
        }
    }
}

/// Partial update merged into an existing annotation.
///
/// Position and size apply to stickers only, color to drawable types only;
/// fields that do not apply to the target are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub size: Option<f32>,
    pub color: Option<Color>,
    pub value: Option<StickerValue>,
}

impl AnnotationPatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }

    pub fn geometry(x: f32, y: f32, size: f32) -> Self {
        Self { x: Some(x), y: Some(y), size: Some(size), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merges the patch into `annotation`, returning whether anything changed.
    pub fn apply(&self, annotation: &mut Annotation) -> bool {
        let before = annotation.clone();

        match annotation {
            Annotation::Sticker(sticker) => {
                if let Some(x) = self.x {
                    sticker.x = x;
                }
                if let Some(y) = self.y {
                    sticker.y = y;
                }
                if let Some(size) = self.size {
                    sticker.size = size;
                }
                if let Some(value) = &self.value {
                    sticker.value = value.clone();
                }
            }
            Annotation::Pencil(Stroke { color, .. })
            | Annotation::Highlighter(Stroke { color, .. })
            | Annotation::Rect(Shape { color, .. })
            | Annotation::Circle(Shape { color, .. })
            | Annotation::Arrow(Shape { color, .. }) => {
                if let Some(new_color) = self.color {
                    *color = new_color;
                }
            }
        }

        *annotation != before
    }
}
