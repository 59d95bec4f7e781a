/// Bounding box in projected coordinates (meters)
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Create bounds from a set of points
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        let mut min_y = f64::MAX;
        let mut max_y = f64::MIN;

        for &(x, y) in points {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        Some(Self {
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Fits projected coordinates (meters) into a square pixel canvas.
///
/// SVG's y axis points down, so north ends up at the top.
#[derive(Debug, Clone)]
pub struct Scaler {
    /// Pixels per meter
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    size_px: f64,
}

impl Scaler {
    /// Create a scaler with a top margin reserved for the title
    ///
    /// # Arguments
    /// * `bounds` - Bounding box in meters
    /// * `size_px` - Canvas width and height
    /// * `top_margin_px` - Rows kept free above the map
    pub fn from_bounds_with_margin(bounds: &Bounds, size_px: f64, top_margin_px: f64) -> Self {
        let width = bounds.width();
        let height = bounds.height();

        let usable = size_px - top_margin_px;
        let max_dim = width.max(height);

        let scale = if max_dim > 0.0 { usable / max_dim } else { 1.0 };

        let scaled_width = width * scale;
        let scaled_height = height * scale;

        let offset_x = (size_px - scaled_width) / 2.0 - bounds.min_x * scale;
        // y is flipped: max_y maps to the top of the usable area
        let offset_y = top_margin_px + (usable - scaled_height) / 2.0 + bounds.max_y * scale;

        Self {
            scale,
            offset_x,
            offset_y,
            size_px,
        }
    }

    /// Scale a point from meters to canvas pixels
    pub fn scale(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale + self.offset_x, self.offset_y - y * self.scale)
    }

    /// Get the scale factor (pixels per meter)
    pub fn scale_factor(&self) -> f64 {
        self.scale
    }

    pub fn size_px(&self) -> f64 {
        self.size_px
    }
}
