#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write a `width`x`height` PNG where the first `dominant` pixels (column by
/// column) have color `main` and the rest cycles through a few other colors.
pub fn write_png(
    dir: &Path,
    name: &str,
    width: u32,
    height: u32,
    main: [u8; 3],
    dominant: u32,
) -> PathBuf {
    let others = [[3, 3, 3], [90, 40, 200], [200, 200, 20]];
    let mut img = RgbImage::new(width, height);
    let mut n = 0;
    for x in 0..width {
        for y in 0..height {
            let color = if n < dominant {
                main
            } else {
                others[(n % 3) as usize]
            };
            img.put_pixel(x, y, Rgb(color));
            n += 1;
        }
    }
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

/// A set of distinguishable PNG images: image `i` is dominated by a color
/// that depends on `i`.
pub fn write_batch(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let main = [(i * 10) as u8, 255 - (i * 10) as u8, 120];
            write_png(dir, &format!("img-{}.png", i), 24, 16, main, 200 + i as u32)
        })
        .collect()
}
