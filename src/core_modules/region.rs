// THEORY:
// A `Region` is the spatial summary of one connected cluster of "different" pixels
// in the binary mask. It is the hand-off format between the Region Detector and
// the Annotator, and the only geometric information the rest of the system keeps
// about a difference.
//
// Key architectural principles:
// 1.  **Dumb Data Container**: A `Region` knows its rectangle and a few derived
//     edges. It does not know which pixels produced it or how different they were.
// 2.  **Canonical Coordinates**: Coordinates are always expressed in the canonical
//     surface the pipeline works on, so the same region can be drawn onto both the
//     reference and the candidate without any scaling.
// 3.  **Transient**: Regions are produced per comparison and never persisted.

/// A 2D pixel coordinate on a canonical surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// An axis-aligned rectangle enclosing one connected cluster of foreground pixels.
///
/// `width` and `height` count pixels, so a single isolated pixel at `(x, y)` is the
/// region `(x, y, 1, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Builds the minimal region spanning two inclusive corners.
    pub fn from_corners(top_left: Point, bottom_right: Point) -> Self {
        Self {
            x: top_left.x,
            y: top_left.y,
            width: bottom_right.x - top_left.x + 1,
            height: bottom_right.y - top_left.y + 1,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when the two rectangles share at least one pixel.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_inclusive() {
        let region = Region::from_corners(Point { x: 50, y: 50 }, Point { x: 69, y: 69 });
        assert_eq!(region, Region::new(50, 50, 20, 20));
        assert_eq!(region.right(), 70);
        assert_eq!(region.area(), 400);
    }

    #[test]
    fn single_pixel_region() {
        let region = Region::from_corners(Point { x: 3, y: 4 }, Point { x: 3, y: 4 });
        assert_eq!(region, Region::new(3, 4, 1, 1));
        assert_eq!(region.area(), 1);
    }

    #[test]
    fn overlap_requires_a_shared_pixel() {
        let a = Region::new(0, 0, 10, 10);
        assert!(a.overlaps(&Region::new(9, 9, 5, 5)));
        assert!(!a.overlaps(&Region::new(10, 0, 5, 5)));
        assert!(!a.overlaps(&Region::new(0, 10, 5, 5)));
    }
}
