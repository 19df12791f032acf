// THEORY:
// The `Annotator` is the last, purely visual stage. It draws the outline of every
// detected region onto a copy of a color surface. The same region list is applied
// to the reference and to the candidate, so the two outputs line up side by side.
//
// The caller's image is never touched; a fresh copy is returned. A stroke of N
// pixels is drawn as N concentric one-pixel outlines, the outermost one lying
// exactly on the region's bounding box, the others stepping inwards.

use crate::core_modules::region::Region;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// Color and thickness of the region outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationStyle {
    pub color: Rgb<u8>,
    pub stroke_width: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: Rgb([255, 0, 0]),
            stroke_width: 2,
        }
    }
}

/// Returns a copy of `image` with an unfilled outline drawn around every region.
pub fn annotate(image: &RgbImage, regions: &[Region], style: &AnnotationStyle) -> RgbImage {
    let mut canvas = image.clone();
    for region in regions {
        draw_outline(&mut canvas, region, style);
    }
    canvas
}

fn draw_outline(canvas: &mut RgbImage, region: &Region, style: &AnnotationStyle) {
    for inset in 0..style.stroke_width {
        let Some(width) = region.width.checked_sub(2 * inset).filter(|w| *w > 0) else {
            break;
        };
        let Some(height) = region.height.checked_sub(2 * inset).filter(|h| *h > 0) else {
            break;
        };
        let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32).of_size(width, height);
        draw_hollow_rect_mut(canvas, rect, style.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, WHITE)
    }

    #[test]
    fn no_regions_is_an_identical_copy() {
        let image = white(250, 160);
        assert_eq!(annotate(&image, &[], &AnnotationStyle::default()), image);
    }

    #[test]
    fn outline_sits_on_the_bounding_box() {
        let image = white(100, 100);
        let annotated = annotate(&image, &[Region::new(50, 50, 20, 20)], &AnnotationStyle::default());

        // Outer ring.
        assert_eq!(*annotated.get_pixel(50, 50), RED);
        assert_eq!(*annotated.get_pixel(69, 50), RED);
        assert_eq!(*annotated.get_pixel(50, 69), RED);
        assert_eq!(*annotated.get_pixel(69, 69), RED);
        assert_eq!(*annotated.get_pixel(60, 50), RED);
        // Second ring of the 2px stroke.
        assert_eq!(*annotated.get_pixel(51, 60), RED);
        assert_eq!(*annotated.get_pixel(68, 60), RED);
        // Unfilled interior and untouched outside.
        assert_eq!(*annotated.get_pixel(60, 60), WHITE);
        assert_eq!(*annotated.get_pixel(52, 60), WHITE);
        assert_eq!(*annotated.get_pixel(49, 60), WHITE);
        assert_eq!(*annotated.get_pixel(70, 60), WHITE);
    }

    #[test]
    fn source_image_is_not_mutated() {
        let image = white(40, 40);
        let _ = annotate(&image, &[Region::new(5, 5, 10, 10)], &AnnotationStyle::default());
        assert!(image.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn thin_regions_do_not_panic() {
        let image = white(20, 20);
        let style = AnnotationStyle { color: RED, stroke_width: 5 };
        let annotated = annotate(&image, &[Region::new(3, 3, 1, 1), Region::new(10, 2, 2, 9)], &style);
        assert_eq!(*annotated.get_pixel(11, 10), RED);
        assert_eq!(*annotated.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn custom_color_is_used() {
        let style = AnnotationStyle { color: Rgb([0, 0, 255]), stroke_width: 1 };
        let annotated = annotate(&white(10, 10), &[Region::new(2, 2, 4, 4)], &style);
        assert_eq!(*annotated.get_pixel(2, 2), Rgb([0, 0, 255]));
        assert_eq!(*annotated.get_pixel(3, 3), WHITE);
    }
}
