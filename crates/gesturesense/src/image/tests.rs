use std::f32::consts::PI;

use crate::rect::Rect;

use super::*;
use Color as C;

fn mkimage<const W: usize, const H: usize>(rows: [[Color; W]; H]) -> Image {
    let mut image = Image::new(W as u32, H as u32);
    for (y, row) in rows.iter().enumerate() {
        for (x, color) in row.iter().enumerate() {
            image.set(x as u32, y as u32, *color);
        }
    }
    image
}

#[test]
fn flip_mirrors_columns() {
    let mut image = mkimage([
        [C::RED, C::GREEN, C::BLUE],
        [C::WHITE, C::BLACK, C::YELLOW],
    ]);
    image.flip_horizontal_in_place();
    assert_eq!(image.get(0, 0), C::BLUE);
    assert_eq!(image.get(1, 0), C::GREEN);
    assert_eq!(image.get(2, 0), C::RED);
    assert_eq!(image.get(0, 1), C::YELLOW);
    assert_eq!(image.get(2, 1), C::WHITE);
}

#[test]
fn pixels_outside_read_as_null() {
    let image = mkimage([[C::RED, C::GREEN], [C::BLUE, C::WHITE]]);
    assert_eq!(image.pixel_at(0.5, 0.5), C::RED);
    assert_eq!(image.pixel_at(1.9, 1.2), C::WHITE);
    assert_eq!(image.pixel_at(-0.1, 0.0), C::NULL);
    assert_eq!(image.pixel_at(2.0, 0.0), C::NULL);
}

#[test]
fn sample_grid_identity() {
    let image = mkimage([[C::RED, C::GREEN], [C::BLUE, C::WHITE]]);
    let roi = Rect::from_top_left(0.0, 0.0, 2.0, 2.0);
    let mut out = Vec::new();
    image.sample_grid(roi.into(), 2, 2, |x, y, c| out.push((x, y, c)));
    assert_eq!(
        out,
        [
            (0, 0, C::RED),
            (1, 0, C::GREEN),
            (0, 1, C::BLUE),
            (1, 1, C::WHITE),
        ]
    );
}

#[test]
fn sample_grid_rotated() {
    let image = mkimage([[C::RED, C::GREEN], [C::BLUE, C::WHITE]]);
    let roi = RotatedRect::new(Rect::from_top_left(0.0, 0.0, 2.0, 2.0), PI);
    let mut out = Vec::new();
    image.sample_grid(roi, 2, 2, |_, _, c| out.push(c));
    assert_eq!(out, [C::WHITE, C::BLUE, C::GREEN, C::RED]);
}

#[test]
fn sample_grid_overhanging_edge() {
    let image = mkimage([[C::RED, C::GREEN]]);
    let roi = Rect::from_top_left(1.0, 0.0, 2.0, 1.0);
    let mut out = Vec::new();
    image.sample_grid(roi.into(), 2, 1, |_, _, c| out.push(c));
    assert_eq!(out, [C::GREEN, C::NULL]);
}

#[test]
fn data_is_rgba_rows() {
    let image = mkimage([[C::RED, C::YELLOW]]);
    assert_eq!(image.data(), [255, 0, 0, 255, 255, 255, 0, 255]);
    assert_eq!(C::YELLOW.rgb(), [255, 255, 0]);
    assert_eq!(format!("{:?}", C::YELLOW), "#ffff00ff");
}
