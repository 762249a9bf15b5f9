/// Axis-aligned rectangle stored as a center plus half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub center_x: f64,
    pub center_y: f64,
    pub half_width: f64,
    pub half_height: f64,
}

impl Rectangle {
    pub fn new(center_x: f64, center_y: f64, half_width: f64, half_height: f64) -> Self {
        Self {
            center_x,
            center_y,
            half_width,
            half_height,
        }
    }

    /// Builds a rectangle from its top-left corner and size.
    pub fn from_bounds(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        Self::new(
            min_x + width / 2.0,
            min_y + height / 2.0,
            width / 2.0,
            height / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.half_width * 2.0
    }

    pub fn height(&self) -> f64 {
        self.half_height * 2.0
    }

    pub fn min_x(&self) -> f64 {
        self.center_x - self.half_width
    }

    pub fn max_x(&self) -> f64 {
        self.center_x + self.half_width
    }

    pub fn min_y(&self) -> f64 {
        self.center_y - self.half_height
    }

    pub fn max_y(&self) -> f64 {
        self.center_y + self.half_height
    }

    pub fn move_center_x(&mut self, x: f64) {
        self.center_x = x;
    }

    pub fn move_center_y(&mut self, y: f64) {
        self.center_y = y;
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.center_x += dx;
        self.center_y += dy;
    }

    /// Grows the rectangle by `x_border` in width and `y_border` in height, split evenly
    /// between both sides.
    pub fn expanded(&self, x_border: f64, y_border: f64) -> Self {
        Self::new(
            self.center_x,
            self.center_y,
            self.half_width + x_border / 2.0,
            self.half_height + y_border / 2.0,
        )
    }

    /// Amount of horizontal overlap with `other`, or `0.0` when the x projections are disjoint.
    pub fn overlap_x(&self, other: &Rectangle) -> f64 {
        if self.center_x <= other.center_x && other.min_x() < self.max_x() {
            return self.max_x() - other.min_x();
        }
        if other.center_x <= self.center_x && self.min_x() < other.max_x() {
            return other.max_x() - self.min_x();
        }
        0.0
    }

    /// Amount of vertical overlap with `other`, or `0.0` when the y projections are disjoint.
    pub fn overlap_y(&self, other: &Rectangle) -> f64 {
        if self.center_y <= other.center_y && other.min_y() < self.max_y() {
            return self.max_y() - other.min_y();
        }
        if other.center_y <= self.center_y && self.min_y() < other.max_y() {
            return other.max_y() - self.min_y();
        }
        0.0
    }

    pub fn overlaps(&self, other: &Rectangle) -> bool {
        self.overlap_x(other) > 0.0 && self.overlap_y(other) > 0.0
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        let min_x = self.min_x().min(other.min_x());
        let min_y = self.min_y().min(other.min_y());
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Self::from_bounds(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}
