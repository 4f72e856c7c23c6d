use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, black_box};

use trackforge::core::Randomizer;
use trackforge::extrusion::{ExtrusionJob, ObjectInput};
use trackforge::path::{PathGenerator, PathStrategy, RandomPath, SegmentLink, TrackContext};
use trackforge::math::Transform;
use trackforge::segment::{Mesh, ObjectSource, Segment, SegmentTemplate};

fn road(divisions: usize) -> Arc<SegmentTemplate> {
    let mut template = SegmentTemplate::straight("road", 4.0, 20.0);
    let mut surface = ObjectSource::new("surface", Transform::IDENTITY).with_mesh(Mesh::strip(4.0, 20.0, divisions));
    surface.settings.bend_mesh = true;
    template.objects.push(surface);
    Arc::new(template)
}

fn generate(generator: &mut PathGenerator, template: &Arc<SegmentTemplate>, count: u64) -> Vec<Segment> {
    let ctx = TrackContext::default();
    generator.initialize(&ctx);
    let mut segments: Vec<Segment> = Vec::with_capacity(count as usize);
    for index in 0..count {
        let mut segment = Segment::instantiate(index, 0, template.clone());
        generator.generate_path(&mut segment, segments.last().map(SegmentLink::of), &ctx);
        segments.push(segment);
    }
    segments
}

fn bench_path_fixed(c: &mut Criterion) {
    let template = road(2);
    let mut generator = PathGenerator::new(PathStrategy::Fixed);

    c.bench_function("path_fixed_32_segments", |b| {
        b.iter(|| generate(&mut generator, black_box(&template), 32));
    });
}

fn bench_path_random(c: &mut Criterion) {
    let template = road(2);
    let strategy = PathStrategy::Random(RandomPath::winding(Randomizer::seeded(7), 45.0, 15.0, 5.0));
    let mut generator = PathGenerator::new(strategy);

    c.bench_function("path_random_32_segments", |b| {
        b.iter(|| generate(&mut generator, black_box(&template), 32));
    });
}

fn bench_extrusion(c: &mut Criterion) {
    for divisions in [8, 64] {
        let template = road(divisions);
        let mut generator = PathGenerator::new(PathStrategy::Random(RandomPath::winding(
            Randomizer::seeded(7),
            45.0,
            15.0,
            5.0,
        )));
        let segments = generate(&mut generator, &template, 2);
        let segment = &segments[1];

        c.bench_function(&format!("extrude_strip_{}", divisions), |b| {
            b.iter(|| {
                let job = ExtrusionJob {
                    segment: segment.index,
                    template: template.clone(),
                    root: segment.transform,
                    bounds: segment.bounds,
                    axis: segment.axis(),
                    spline: segment.path.spline().clone(),
                    stitch: segments[0].end_sample(),
                    objects: segment
                        .objects
                        .iter()
                        .map(|o| ObjectInput { source: o.source, settings: o.settings.clone(), errored: o.errored })
                        .collect(),
                };
                black_box(job.run())
            });
        });
    }
}

criterion_group!(benches, bench_path_fixed, bench_path_random, bench_extrusion);
criterion_main!(benches);
