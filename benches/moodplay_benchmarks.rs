//! # moodplay Performance Benchmarks
//!
//! Classification runs on every typed line and selection lists the songs
//! folder on every play, so both should stay well under a frame.
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench detect
//! cargo bench select
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use moodplay::library::Library;
use moodplay::mood::{detect_mood, Mood};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::hint::black_box;
use tempfile::TempDir;

/// Helper function to create a songs folder with `per_mood` files per mood
/// plus the same number of unrelated files.
fn create_songs_dir(per_mood: usize) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    for mood in Mood::ALL {
        for i in 0..per_mood {
            let path = temp_dir.path().join(format!("track_{i:04}_{mood}.mp3"));
            fs::write(path, b"").expect("Failed to create track");
        }
    }
    for i in 0..per_mood {
        fs::write(temp_dir.path().join(format!("podcast_{i:04}.mp3")), b"")
            .expect("Failed to create filler");
    }
    temp_dir
}

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");

    let inputs = [
        ("first_mood", "I feel so happy and excited today"),
        ("last_mood", "I am furious and mad"),
        ("fallback", "nothing in particular, just another tuesday"),
    ];
    for (name, text) in inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| detect_mood(black_box(text)));
        });
    }

    let long = "the weather was grey and the train was late ".repeat(50) + "but I feel calm";
    group.bench_function("long_text", |b| b.iter(|| detect_mood(black_box(&long))));

    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");

    for per_mood in [10, 100, 1000] {
        let dir = create_songs_dir(per_mood);
        let library = Library::new(dir.path());
        let mut rng = StdRng::seed_from_u64(7);

        group.bench_with_input(
            BenchmarkId::new("select_track", per_mood),
            &per_mood,
            |b, _| {
                b.iter(|| {
                    library
                        .select_track_with(black_box(Mood::Sad), &mut rng)
                        .expect("track")
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_detect, bench_select);
criterion_main!(benches);
