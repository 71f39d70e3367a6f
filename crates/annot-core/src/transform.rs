//! Screen <-> page-intrinsic coordinate conversion
//!
//! Annotation geometry lives in page-intrinsic space (the page image's
//! natural pixel grid). Screen space is what the pointer reports: the page's
//! rendered origin plus `page * zoom`. Only rendering and pointer input cross
//! between the two.

use annot_model::{PagePoint, PageSize, ScreenPoint};

/// Ephemeral view transform of one displayed page, recomputed per render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformContext {
    pub natural_width: f32,
    pub natural_height: f32,
    pub zoom: f32,
    /// Screen position of the page's top-left corner.
    pub origin: ScreenPoint,
}

impl TransformContext {
    pub fn new(natural_width: f32, natural_height: f32, zoom: f32) -> Self {
        Self { natural_width, natural_height, zoom, origin: ScreenPoint::default() }
    }

    pub fn for_page(size: PageSize, zoom: f32) -> Self {
        Self::new(size.width, size.height, zoom)
    }

    pub fn with_origin(mut self, origin: ScreenPoint) -> Self {
        self.origin = origin;
        self
    }

    pub fn page_size(&self) -> PageSize {
        PageSize::new(self.natural_width, self.natural_height)
    }

    /// False while the page image has not reported its natural size; every
    /// conversion is refused in that state.
    pub fn is_ready(&self) -> bool {
        self.page_size().is_known() && self.zoom.is_finite() && self.zoom > 0.0
    }

    pub fn to_page_space(&self, point: ScreenPoint) -> Option<PagePoint> {
        if !self.is_ready() {
            return None;
        }

        Some(PagePoint::new(
            (point.x - self.origin.x) / self.zoom,
            (point.y - self.origin.y) / self.zoom,
        ))
    }

    pub fn to_screen_space(&self, point: PagePoint) -> Option<ScreenPoint> {
        if !self.is_ready() {
            return None;
        }

        Some(ScreenPoint::new(
            self.origin.x + point.x * self.zoom,
            self.origin.y + point.y * self.zoom,
        ))
    }

    /// Converts a screen-space displacement into page-intrinsic units.
    pub fn to_page_delta(&self, dx: f32, dy: f32) -> Option<(f32, f32)> {
        if !self.is_ready() {
            return None;
        }

        Some((dx / self.zoom, dy / self.zoom))
    }

    /// Rendered page size in screen pixels.
    pub fn screen_size(&self) -> (f32, f32) {
        (self.natural_width * self.zoom, self.natural_height * self.zoom)
    }

    /// Raster surface dimensions for the page at the current zoom.
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        if !self.is_ready() {
            return None;
        }

        let (width, height) = self.screen_size();
        Some((width.ceil().max(1.0) as u32, height.ceil().max(1.0) as u32))
    }

    /// Whether a screen point falls on the rendered page.
    pub fn contains(&self, point: ScreenPoint) -> bool {
        let Some(page) = self.to_page_space(point) else {
            return false;
        };

        page.x >= 0.0
            && page.y >= 0.0
            && page.x <= self.natural_width
            && page.y <= self.natural_height
    }
}
