use criterion::{Criterion, criterion_group, criterion_main};
use raspadinha_core::*;
use std::hint::black_box;
use web_time::{Duration, Instant};

fn scratched_mask(size: u32) -> AlphaMask {
    let mut mask = AlphaMask::opaque(size, size);
    let mut y = 10.0;
    while y < f64::from(size) / 2.0 {
        let mut x = 0.0;
        while x < f64::from(size) {
            mask.erase_circle(Point::new(x, y), 25.0);
            x += 12.5;
        }
        y += 40.0;
    }
    mask
}

fn bench_sampling(c: &mut Criterion) {
    let sampler = CoverageSampler::default();
    for size in [300, 600] {
        let mask = scratched_mask(size);
        c.bench_function(&format!("sample_{size}"), |b| {
            b.iter(|| sampler.sample(black_box(&mask)).unwrap())
        });
    }
}

fn bench_stroke(c: &mut Criterion) {
    let symbols = (0..CELL_COUNT)
        .map(|i| Symbol::new(format!("s{i}"), "", Rarity::Common, Money::ZERO))
        .collect();
    let card = ScratchCard::new(symbols, false).unwrap();

    c.bench_function("stroke_across_cover", |b| {
        b.iter(|| {
            let mut detector = RevealDetector::default();
            detector.load_card(card.clone());
            detector.cover_loaded();
            let mut mask = AlphaMask::opaque(300, 300);
            let t0 = Instant::now();
            detector.begin_stroke(&mut mask, Point::new(0.0, 150.0), t0);
            for step in 1..=30u32 {
                let now = t0 + Duration::from_millis(u64::from(step) * 20);
                detector.continue_stroke(&mut mask, Point::new(f64::from(step) * 10.0, 150.0), now);
            }
            black_box(detector.end_stroke(&mask, t0 + Duration::from_secs(1)))
        })
    });
}

criterion_group!(benches, bench_sampling, bench_stroke);
criterion_main!(benches);
