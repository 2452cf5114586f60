use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use signlens::{BaselineFilter, Hand, HandSide, LandmarkPoint, UserKey};
use std::hint::black_box;

/// Hands jittering slightly around a resting pose, with an occasional spike.
fn frames(count: usize, hands_per_frame: usize) -> Vec<Vec<Hand>> {
    (0..count)
        .map(|i| {
            let jitter = (i % 7) as f32 * 0.002;
            let spike = if i % 50 == 49 { 0.3 } else { 0.0 };
            let point = LandmarkPoint::new(0.5 + jitter + spike, 0.5 - jitter, 0.0);
            [HandSide::Left, HandSide::Right]
                .into_iter()
                .take(hands_per_frame)
                .map(|side| Hand::uniform(side, 21, point))
                .collect()
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("baseline_filter");

    for hands in [1usize, 2] {
        let input = frames(300, hands);
        group.bench_with_input(BenchmarkId::new("frames_300", hands), &input, |b, input| {
            b.iter(|| {
                let mut filter = BaselineFilter::new();
                let user = UserKey::new("bench");
                let mut filtered = 0usize;
                for frame in input {
                    if filter.filter(&user, black_box(frame.clone())).filtered {
                        filtered += 1;
                    }
                }
                black_box(filtered)
            })
        });
    }

    group.finish();
}

fn bench_many_users(c: &mut Criterion) {
    let input = frames(30, 2);
    let users: Vec<UserKey> = (0..32).map(|i| UserKey::new(format!("user-{i}"))).collect();

    c.bench_function("baseline_filter/32_users", |b| {
        b.iter(|| {
            let mut filter = BaselineFilter::new();
            for frame in &input {
                for user in &users {
                    black_box(filter.filter(user, frame.clone()));
                }
            }
            filter.user_count()
        })
    });
}

criterion_group!(benches, bench_filter, bench_many_users);
criterion_main!(benches);
