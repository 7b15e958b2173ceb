//! Most popular color of an image.
//!
//! Every pixel is reduced to a [`ColorBucket`] by rounding each channel to
//! the nearest multiple of 10, and the buckets are counted in a
//! [`Histogram`]. The bucket with the highest count is the most popular
//! color; its share of the pixels is the coverage.
//!
//! The scan is intentionally naive: it is the unit of CPU-bound work the
//! [`ThreadPool`](crate::thread_pool::ThreadPool) spreads across its workers.
use image::{DynamicImage, RgbImage};
use log::trace;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod err;

use err::HistogramError;

/// Round `channel` to the nearest multiple of 10.
///
/// Halfway values go to the even multiple of 10 (25 -> 20, 35 -> 40), so 255
/// becomes 260.
pub fn quantize(channel: u8) -> u16 {
    let tens = u16::from(channel / 10);
    let rest = channel % 10;
    let rounded = match rest {
        0..=4 => tens,
        5 if tens % 2 == 0 => tens,
        _ => tens + 1,
    };
    rounded * 10
}

/// Round `value` to two decimals, halfway values going to the even digit.
pub fn round_coverage(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// A quantized RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorBucket {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl ColorBucket {
    pub fn new(r: u16, g: u16, b: u16) -> Self {
        ColorBucket { r, g, b }
    }

    /// Bucket of the pixel `(r, g, b)`.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        ColorBucket {
            r: quantize(r),
            g: quantize(g),
            b: quantize(b),
        }
    }
}

impl fmt::Display for ColorBucket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Occurrences of each bucket, in the order the buckets were first seen.
#[derive(Debug, Default, Clone)]
pub struct Histogram {
    entries: Vec<(ColorBucket, u64)>,
    positions: HashMap<ColorBucket, usize>,
    total: u64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `bucket`.
    pub fn insert(&mut self, bucket: ColorBucket) {
        match self.positions.get(&bucket) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.positions.insert(bucket, self.entries.len());
                self.entries.push((bucket, 1));
            }
        }
        self.total += 1;
    }

    /// Number of distinct buckets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of counted pixels.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, bucket: &ColorBucket) -> u64 {
        self.positions
            .get(bucket)
            .map_or(0, |&pos| self.entries[pos].1)
    }

    /// Buckets and counts in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &(ColorBucket, u64)> {
        self.entries.iter()
    }

    /// The bucket with the highest count.
    /// Among buckets with the same count, the one seen first wins.
    pub fn dominant(&self) -> Option<(ColorBucket, u64)> {
        let mut best: Option<(ColorBucket, u64)> = None;
        for &(bucket, count) in &self.entries {
            if best.map_or(true, |(_, max)| count > max) {
                best = Some((bucket, count));
            }
        }
        best
    }
}

/// Build the histogram of `image`, scanning it column by column.
pub fn histogram_of(image: &RgbImage) -> Histogram {
    let (width, height) = image.dimensions();
    let mut histogram = Histogram::new();
    for x in 0..width {
        for y in 0..height {
            let [r, g, b] = image.get_pixel(x, y).0;
            histogram.insert(ColorBucket::from_rgb(r, g, b));
        }
    }
    histogram
}

/// The most popular color of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorResult {
    pub task: PathBuf,
    pub bucket: ColorBucket,
    /// Share of the pixels in `bucket`, in percent with two decimals.
    pub coverage: f64,
}

impl fmt::Display for ColorResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let coverage = self.coverage.to_string();
        let coverage = if coverage.contains('.') {
            coverage
        } else {
            coverage + ".0"
        };
        write!(
            f,
            "The most popular color in {}\t{} covers {}%",
            self.task.display(),
            self.bucket,
            coverage
        )
    }
}

/// Find the most popular color of an already decoded image.
/// `path` only identifies the image in the result.
pub fn dominant_color(path: &Path, image: &DynamicImage) -> Result<ColorResult, HistogramError> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(HistogramError::EmptyImage {
            path: path.to_path_buf(),
        });
    }

    let histogram = histogram_of(&rgb);
    let (bucket, count) = histogram.dominant().ok_or_else(|| HistogramError::EmptyImage {
        path: path.to_path_buf(),
    })?;
    let coverage = round_coverage(count as f64 / histogram.total() as f64 * 100.0);
    trace!(
        "{}: {} buckets, {} covers {}%",
        path.display(),
        histogram.len(),
        bucket,
        coverage
    );

    Ok(ColorResult {
        task: path.to_path_buf(),
        bucket,
        coverage,
    })
}

/// Decode the image at `path` and find its most popular color.
pub fn compute<P: AsRef<Path>>(path: P) -> Result<ColorResult, HistogramError> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|e| HistogramError::Decode {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    dominant_color(path, &image)
}
