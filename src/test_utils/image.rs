use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// A full-resolution "scan" with position-dependent pixels, so crops and
/// pastes can be traced back to their source coordinates
pub fn scan() -> RgbaImage {
    RgbaImage::from_fn(745, 1040, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

pub fn scan_png() -> Vec<u8> {
    png_bytes(&scan())
}

pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
}

pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    png_bytes(&solid(width, height, rgba))
}
