use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Deterministic noise so JPEG output has a realistic size.
fn noise_image(width: u32, height: u32) -> RgbImage {
    let mut seed: u32 = 0x2545_f491;
    RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed & 0xff) as u8
        };
        Rgb([next(), next(), next()])
    })
}

fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
    buffer
}

/// A noisy JPEG of a few tens of kilobytes.
pub fn jpeg_photo() -> Vec<u8> {
    encode(&noise_image(160, 160), ImageFormat::Jpeg)
}

pub fn small_png() -> Vec<u8> {
    encode(&RgbImage::from_pixel(4, 4, Rgb([0, 0, 255])), ImageFormat::Png)
}

pub fn corrupt_bytes() -> Vec<u8> {
    b"this is not an image at all, just some text".to_vec()
}
