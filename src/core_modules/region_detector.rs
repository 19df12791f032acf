// THEORY:
// The `RegionDetector` is the spatial grouping stage. It reads the binary mask
// and finds every connected cluster of foreground ("different") pixels, reducing
// each one to the smallest axis-aligned rectangle that encloses it.
//
// Key architectural principles & algorithm steps:
// 1.  **Seeding in Raster Order**: The mask is scanned row by row. The first
//     unvisited foreground pixel met becomes the seed of a new region, which gives
//     a stable (but otherwise meaningless) enumeration order.
// 2.  **Region Growing**: From the seed, a depth-first flood fill visits all
//     foreground pixels reachable through any of the 8 neighbors (diagonals
//     included). A `visited` grid guarantees every pixel is claimed exactly once.
// 3.  **Bounding Box Aggregation**: While growing, the running min/max of the
//     coordinates is kept. Holes inside a cluster never produce extra regions of
//     their own because background pixels are never seeds.
// 4.  **Stateless Utility**: `find_regions` has no memory. An all-background mask
//     yields an empty list, which simply means "no differences".

use crate::core_modules::mask_extractor::BinaryMask;
use crate::core_modules::region::{Point, Region};

pub mod region_detector {
    use super::*;

    /// The 8-connected neighborhood, diagonals included.
    const NEIGHBORS: [(i64, i64); 8] = [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)];

    /// Finds every 8-connected foreground cluster in `mask` and returns its bounding box.
    pub fn find_regions(mask: &BinaryMask) -> Vec<Region> {
        let width = mask.width() as usize;
        let height = mask.height() as usize;
        let mut visited = vec![false; width * height];
        let mut regions: Vec<Region> = Vec::new();

        for y in 0..height {
            for x in 0..width {
                if visited[y * width + x] || !mask.is_foreground(x as u32, y as u32) {
                    continue;
                }
                let seed = Point { x: x as u32, y: y as u32 };
                regions.push(grow_region_from_seed(seed, mask, &mut visited));
            }
        }

        regions
    }

    /// Flood-fills the cluster containing `seed` and returns its bounding box.
    fn grow_region_from_seed(seed: Point, mask: &BinaryMask, visited: &mut [bool]) -> Region {
        let width = mask.width() as i64;
        let height = mask.height() as i64;
        let mut stack: Vec<Point> = vec![seed];
        visited[(seed.y as i64 * width + seed.x as i64) as usize] = true;

        let mut top_left = seed;
        let mut bottom_right = seed;

        while let Some(current) = stack.pop() {
            top_left.x = top_left.x.min(current.x);
            top_left.y = top_left.y.min(current.y);
            bottom_right.x = bottom_right.x.max(current.x);
            bottom_right.y = bottom_right.y.max(current.y);

            for (dx, dy) in NEIGHBORS {
                let nx = current.x as i64 + dx;
                let ny = current.y as i64 + dy;
                if nx < 0 || nx >= width || ny < 0 || ny >= height {
                    continue;
                }
                let index = (ny * width + nx) as usize;
                if !visited[index] && mask.is_foreground(nx as u32, ny as u32) {
                    visited[index] = true;
                    stack.push(Point { x: nx as u32, y: ny as u32 });
                }
            }
        }

        Region::from_corners(top_left, bottom_right)
    }
}

#[cfg(test)]
mod tests {
    use super::region_detector::find_regions;
    use super::*;
    use image::{GrayImage, Luma};
    use std::collections::HashSet;

    fn mask_with(width: u32, height: u32, foreground: &[(u32, u32)]) -> BinaryMask {
        let mut image = GrayImage::new(width, height);
        for &(x, y) in foreground {
            image.put_pixel(x, y, Luma([255]));
        }
        BinaryMask::from_image(image)
    }

    fn filled(rect: Region) -> Vec<(u32, u32)> {
        (rect.y..rect.bottom())
            .flat_map(|y| (rect.x..rect.right()).map(move |x| (x, y)))
            .collect()
    }

    #[test]
    fn empty_mask_has_no_regions() {
        assert!(find_regions(&mask_with(250, 160, &[])).is_empty());
    }

    #[test]
    fn full_mask_is_one_canvas_sized_region() {
        let all = filled(Region::new(0, 0, 250, 160));
        assert_eq!(find_regions(&mask_with(250, 160, &all)), vec![Region::new(0, 0, 250, 160)]);
    }

    #[test]
    fn diagonal_pixels_are_connected() {
        let regions = find_regions(&mask_with(10, 10, &[(2, 2), (3, 3), (4, 4)]));
        assert_eq!(regions, vec![Region::new(2, 2, 3, 3)]);
    }

    #[test]
    fn separate_clusters_produce_separate_regions() {
        let mut pixels = filled(Region::new(10, 10, 5, 8));
        pixels.extend(filled(Region::new(60, 70, 12, 3)));
        pixels.push((99, 0));
        let regions: HashSet<Region> = find_regions(&mask_with(100, 100, &pixels)).into_iter().collect();
        let expected: HashSet<Region> =
            [Region::new(10, 10, 5, 8), Region::new(60, 70, 12, 3), Region::new(99, 0, 1, 1)].into_iter().collect();
        assert_eq!(regions, expected);
    }

    #[test]
    fn ring_with_hole_is_a_single_region() {
        let mut pixels = Vec::new();
        for i in 0..9 {
            pixels.extend([(i + 5, 5), (i + 5, 13), (5, i + 5), (13, i + 5)]);
        }
        assert_eq!(find_regions(&mask_with(20, 20, &pixels)), vec![Region::new(5, 5, 9, 9)]);
    }

    #[test]
    fn concave_shape_bounds_all_arms() {
        // An "L" shape reaching the bottom-left and top-right.
        let mut pixels = filled(Region::new(2, 20, 20, 2));
        pixels.extend(filled(Region::new(20, 2, 2, 18)));
        assert_eq!(find_regions(&mask_with(30, 30, &pixels)), vec![Region::new(2, 2, 20, 20)]);
    }
}
