use image::{Rgb, RgbImage};
use vision_core::overlay::{class_color, draw_label, draw_rect, pixel_rect};

#[test]
fn pixel_rect_scales_and_clamps() {
    assert_eq!(pixel_rect([0.1, 0.2, 0.3, 0.4], (100, 200)), Some([10, 40, 30, 80]));
    assert_eq!(pixel_rect([0.0, 0.0, 1.0, 1.0], (64, 48)), Some([0, 0, 63, 47]));
    assert_eq!(pixel_rect([-0.5, 0.0, 1.5, 1.0], (10, 10)), Some([0, 0, 9, 9]));
    assert_eq!(pixel_rect([0.5, 0.5, 0.1, 0.9], (64, 48)), None);
    assert_eq!(pixel_rect([0.0, 0.0, 1.0, 1.0], (0, 48)), None);
}

#[test]
fn draws_outline_rings_only() {
    let red = Rgb([255, 0, 0]);
    let mut img = RgbImage::new(40, 40);
    draw_rect(&mut img, [5, 5, 10, 10], red, 2);
    for (x, y) in [(5, 5), (10, 5), (5, 10), (10, 10), (6, 6), (9, 9)] {
        assert_eq!(img.get_pixel(x, y), &red, "({x},{y})");
    }
    assert_eq!(img.get_pixel(8, 8), &Rgb([0, 0, 0]));
    assert_eq!(img.get_pixel(4, 4), &Rgb([0, 0, 0]));
}

#[test]
fn oversized_thickness_and_rect_stay_in_bounds() {
    let mut img = RgbImage::new(8, 8);
    draw_rect(&mut img, [0, 0, 50, 50], Rgb([1, 2, 3]), 20);
    assert_eq!(img.get_pixel(7, 7), &Rgb([1, 2, 3]));
}

#[test]
fn label_uses_class_color() {
    let mut img = RgbImage::new(20, 20);
    assert!(draw_label(&mut img, [0.0, 0.0, 0.5, 0.5], 2, 1));
    assert_eq!(img.get_pixel(0, 0), &class_color(2));
    assert!(!draw_label(&mut img, [0.9, 0.9, 0.1, 0.1], 2, 1));
    assert_eq!(class_color(1), class_color(7));
}
