//! Benchmarks du calcul d'éligibilité sur une grille synthétique

use coopzone::{run, BuildingRecord, ParcelRecord, RunOptions, Snapshot, ZoningLookup};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::{coord, Geometry, Rect};

fn square(x: f64, y: f64, size: f64) -> Geometry<f64> {
    Geometry::Polygon(Rect::new(coord! { x: x, y: y }, coord! { x: x + size, y: y + size }).to_polygon())
}

/// Grille de `side` x `side` parcelles de 100 pieds, une maison sur deux
fn grid(side: u32) -> Snapshot {
    let mut parcels = Vec::new();
    let mut buildings = Vec::new();

    for i in 0..side {
        for j in 0..side {
            let x = f64::from(i) * 100.0;
            let y = f64::from(j) * 100.0;
            let id = i * side + j;

            parcels.push(ParcelRecord {
                parcel_id: Some(id.to_string()),
                zoning_code: Some("R8".to_string()),
                geometry: Some(square(x, y, 100.0)),
            });

            if (i + j) % 2 == 0 {
                buildings.push(BuildingRecord {
                    facility_id: Some(format!("B{id}")),
                    geometry: Some(square(x + 30.0, y + 30.0, 40.0)),
                    use_type: Some("Household".to_string()),
                    unit_count: Some(1),
                    ownership: None,
                });
            }
        }
    }

    Snapshot {
        parcels,
        buildings,
        zoning: ZoningLookup::from_pairs([("R8", "Residential single family")]),
    }
}

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run");
    group.sample_size(10);

    for side in [10u32, 20, 40] {
        let snapshot = grid(side);
        group.throughput(Throughput::Elements(u64::from(side * side)));

        group.bench_with_input(BenchmarkId::from_parameter(side * side), &snapshot, |b, s| {
            b.iter(|| {
                let output = run(black_box(s.clone()), &RunOptions::default()).unwrap();
                black_box(output)
            })
        });
    }

    group.finish();
}

fn bench_radius(c: &mut Criterion) {
    let snapshot = grid(20);
    let mut group = c.benchmark_group("radius");
    group.sample_size(10);

    for radius in [50.0_f64, 200.0, 500.0] {
        let options = RunOptions {
            buffer_radius: radius,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(radius), &options, |b, o| {
            b.iter(|| {
                let output = run(black_box(snapshot.clone()), o).unwrap();
                black_box(output)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_run, bench_radius);
criterion_main!(benches);
