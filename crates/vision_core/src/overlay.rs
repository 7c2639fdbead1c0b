use image::{Rgb, RgbImage};

/// Distinct outline colors, cycled by class id.
const PALETTE: [Rgb<u8>; 6] = [
    Rgb([170, 0, 0]),
    Rgb([0, 140, 60]),
    Rgb([20, 60, 200]),
    Rgb([220, 150, 0]),
    Rgb([150, 0, 170]),
    Rgb([0, 160, 170]),
];

pub fn class_color(class_id: usize) -> Rgb<u8> {
    PALETTE[class_id % PALETTE.len()]
}

/// Map normalized corners `[x1, y1, x2, y2]` to inclusive pixel corners,
/// clamped to the image. `None` for an empty image or an inverted box.
pub fn pixel_rect(corners: [f64; 4], dims: (u32, u32)) -> Option<[u32; 4]> {
    let (w, h) = dims;
    if w == 0 || h == 0 {
        return None;
    }
    let to_px = |v: f64, extent: u32| (v * extent as f64).clamp(0.0, (extent - 1) as f64) as u32;
    let rect = [
        to_px(corners[0], w),
        to_px(corners[1], h),
        to_px(corners[2], w),
        to_px(corners[3], h),
    ];
    (rect[0] <= rect[2] && rect[1] <= rect[3]).then_some(rect)
}

/// Outline `rect` inward with `thickness` pixel rings; rings that collapse are skipped.
pub fn draw_rect(img: &mut RgbImage, rect: [u32; 4], color: Rgb<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let [x0, y0, x1, y1] = [rect[0], rect[1], rect[2].min(w - 1), rect[3].min(h - 1)];
    for t in 0..thickness {
        let (left, top) = (x0 + t, y0 + t);
        let (Some(right), Some(bottom)) = (x1.checked_sub(t), y1.checked_sub(t)) else {
            break;
        };
        if left > right || top > bottom {
            break;
        }
        for x in left..=right {
            img.put_pixel(x, top, color);
            img.put_pixel(x, bottom, color);
        }
        for y in top..=bottom {
            img.put_pixel(left, y, color);
            img.put_pixel(right, y, color);
        }
    }
}

/// Draw one normalized label box in its class color. Returns false when the
/// box maps to nothing drawable.
pub fn draw_label(img: &mut RgbImage, corners: [f64; 4], class_id: usize, thickness: u32) -> bool {
    match pixel_rect(corners, img.dimensions()) {
        Some(rect) => {
            draw_rect(img, rect, class_color(class_id), thickness);
            true
        }
        None => false,
    }
}
