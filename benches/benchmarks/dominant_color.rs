/*
    Most popular color of a batch of noisy images, sequential and on pools
    of growing size.
*/
use std::path::PathBuf;

use criterion::{AxisScale, BatchSize, BenchmarkId, Criterion, PlotConfiguration, SamplingMode};
use image::{DynamicImage, Rgb, RgbImage};
use popcolor::histogram::dominant_color;
use popcolor::thread_pool::ThreadPool;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn noisy_images(count: usize, width: u32, height: u32) -> Vec<(PathBuf, DynamicImage)> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|i| {
            let img = RgbImage::from_fn(width, height, |_, _| {
                Rgb([rng.gen_range(0..64), rng.gen(), rng.gen_range(192..=255)])
            });
            (PathBuf::from(format!("noise-{}", i)), DynamicImage::ImageRgb8(img))
        })
        .collect()
}

pub fn dominant_color_batch(criterion: &mut Criterion) {
    let plot_cfg = PlotConfiguration::default().summary_scale(AxisScale::Linear);
    let mut group = criterion.benchmark_group("Dominant color");
    group
        .sampling_mode(SamplingMode::Flat)
        .plot_config(plot_cfg)
        .sample_size(10);

    let images = noisy_images(20, 512, 384);

    group.bench_function(BenchmarkId::new("sequential", 1), |b| {
        b.iter_batched(
            || images.clone(),
            |images| {
                images
                    .iter()
                    .map(|(path, img)| dominant_color(path, img).unwrap())
                    .collect::<Vec<_>>()
            },
            BatchSize::LargeInput,
        )
    });

    let mut threads = 1;
    while threads <= num_cpus::get() {
        let mut pool = ThreadPool::with_capacity(threads).unwrap();
        group.bench_function(BenchmarkId::new("thread-pool", threads), |b| {
            b.iter_batched(
                || images.clone(),
                |images| {
                    pool.try_par_map(images, |(path, img)| dominant_color(&path, &img))
                        .unwrap()
                },
                BatchSize::LargeInput,
            )
        });
        threads *= 2;
    }
    group.finish();
}

criterion::criterion_group!(benches, dominant_color_batch);
