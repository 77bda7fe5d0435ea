//! Palette-indexed pixel images carried by actors.

use crate::MAX_PALETTE_INDEX;

/// A 2-D grid of palette indices, stored row-major. Index 0 is transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelImage {
    /// Creates a fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize)],
        }
    }

    /// Builds an image from a flat wire sequence.
    ///
    /// Out-of-range palette entries become transparent. A short sequence
    /// leaves the remaining pixels transparent; extra entries are ignored.
    pub fn from_indices(width: u32, height: u32, indices: &[i64]) -> Self {
        let mut image = Self::new(width, height);
        image.overwrite_from_indices(indices);
        image
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn fill(&mut self, color: u8) {
        self.pixels.fill(clamp_palette(color as i64));
    }

    /// Out-of-bounds reads return transparent.
    pub fn get_pixel(&self, x: i32, y: i32) -> u8 {
        match self.index_of(x, y) {
            Some(idx) => self.pixels[idx],
            None => 0,
        }
    }

    /// Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u8) {
        if let Some(idx) = self.index_of(x, y) {
            self.pixels[idx] = clamp_palette(color as i64);
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u8) {
        for yy in y..y.saturating_add(h) {
            for xx in x..x.saturating_add(w) {
                self.set_pixel(xx, yy, color);
            }
        }
    }

    /// Flat sequence of palette indices for the wire.
    pub fn to_indices(&self) -> Vec<i64> {
        self.pixels.iter().map(|&p| p as i64).collect()
    }

    /// Overwrites pixels in place, keeping the current dimensions.
    pub fn overwrite_from_indices(&mut self, indices: &[i64]) {
        for (slot, &value) in self.pixels.iter_mut().zip(indices) {
            *slot = clamp_palette(value);
        }
    }

    /// Position of the last non-transparent pixel, if any.
    pub fn last_non_zero(&self) -> Option<usize> {
        self.pixels.iter().rposition(|&p| p != 0)
    }

    pub fn is_blank(&self) -> bool {
        self.last_non_zero().is_none()
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

fn clamp_palette(value: i64) -> u8 {
    if (0..=MAX_PALETTE_INDEX as i64).contains(&value) {
        value as u8
    } else {
        0
    }
}
