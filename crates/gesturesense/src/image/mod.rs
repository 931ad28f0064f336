//! Camera frames and what is done to them.
//!
//! A frame is decoded from the webcam's MJPG stream into an [`Image`], mirrored, resampled into the
//! networks' input tensors, annotated with [`draw`] and finally uploaded to the preview window.

pub mod draw;
mod jpeg;
mod resolution;

#[cfg(test)]
mod tests;

use std::fmt;

use embedded_graphics::{pixelcolor::raw::RawU32, prelude::PixelColor};
use image::{Rgba, RgbaImage};

pub use resolution::*;

use crate::rect::RotatedRect;

/// An RGBA8 frame.
///
/// The pixel layout is the one the preview window uploads, so [`Image::data`] needs no conversion.
#[derive(Clone)]
pub struct Image {
    pixels: RgbaImage,
}

impl Image {
    /// Creates a `width x height` image with every pixel set to [`Color::NULL`].
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    /// Decodes an MJPG frame.
    pub fn decode_jpeg(data: &[u8]) -> anyhow::Result<Self> {
        let pixels = jpeg::decode(data)?;
        Ok(Self { pixels })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        let (width, height) = self.pixels.dimensions();
        Resolution::new(width, height)
    }

    /// Panics if `(x, y)` is out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.pixels.get_pixel(x, y).0)
    }

    /// Panics if `(x, y)` is out of bounds.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels.put_pixel(x, y, Rgba(color.0));
    }

    /// Reads the pixel containing `(x, y)`, or [`Color::NULL`] outside of the image.
    fn pixel_at(&self, x: f32, y: f32) -> Color {
        let inside_x = (0.0..self.width() as f32).contains(&x);
        let inside_y = (0.0..self.height() as f32).contains(&y);
        if inside_x && inside_y {
            self.get(x as u32, y as u32)
        } else {
            Color::NULL
        }
    }

    /// Resamples the area covered by `roi` into a `width x height` grid.
    ///
    /// `f` receives the column, row and the color at the center of every cell. Cells are visited
    /// row by row. Parts of `roi` that hang over the image edge read as [`Color::NULL`].
    pub fn sample_grid(
        &self,
        roi: RotatedRect,
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize, Color),
    ) {
        let cell_w = roi.rect().width() / width as f32;
        let cell_h = roi.rect().height() / height as f32;
        for row in 0..height {
            let cy = (row as f32 + 0.5) * cell_h;
            for col in 0..width {
                let cx = (col as f32 + 0.5) * cell_w;
                let [x, y] = roi.transform_out([cx, cy]);
                f(col, row, self.pixel_at(x, y));
            }
        }
    }

    /// Mirrors the frame left to right, so that it looks like a selfie view.
    pub fn flip_horizontal_in_place(&mut self) {
        image::imageops::flip_horizontal_in_place(&mut self.pixels);
    }

    /// The raw RGBA8 bytes, top row first.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.pixels.as_raw()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({})", self.resolution())
    }
}

/// An sRGB color with straight (non-premultiplied) alpha.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Color(pub(crate) [u8; 4]);

impl Color {
    /// All components zero. Used for pixels outside of an image.
    pub const NULL: Self = Self([0, 0, 0, 0]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0, 255]);
    pub const GREEN: Self = Self([0, 255, 0, 255]);
    pub const BLUE: Self = Self([0, 0, 255, 255]);
    pub const YELLOW: Self = Self([255, 255, 0, 255]);

    /// The color channels without alpha.
    #[inline]
    pub fn rgb(&self) -> [u8; 3] {
        let [r, g, b, _] = self.0;
        [r, g, b]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

impl PixelColor for Color {
    type Raw = RawU32;
}
