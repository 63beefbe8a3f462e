use criterion::{black_box, criterion_group, criterion_main, Criterion};
use las_dataset::{Dataset, Point, PointCloud};
use std::io::Cursor;

fn roundtrip(npoints: usize) {
    let mut pointcloud = PointCloud::default();
    for i in 0..npoints {
        pointcloud.push(&Point {
            x: i as f64,
            y: i as f64,
            z: i as f64,
            ..Default::default()
        });
    }
    let dataset = Dataset::new(pointcloud).unwrap();
    let mut cursor = Cursor::new(Vec::new());
    dataset.write_to(&mut cursor).unwrap();
    cursor.set_position(0);
    let read_back = Dataset::read_from(cursor).unwrap();
    assert_eq!(npoints, read_back.len());
}

fn bench(criterion: &mut Criterion) {
    for npoints in [0, 10, 1_000, 100_000] {
        let _ = criterion.bench_function(&format!("roundtrip {} points", npoints), |b| {
            b.iter(|| roundtrip(black_box(npoints)))
        });
    }
}

criterion_group!(benches, bench);
criterion_main!(benches);
