//! Benchmark: OBJ parsing and triangulation

use asset_relay::loader::obj::{parse_face, ObjParser, ObjSink, ParsedMesh};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::fmt::Write as _;

struct Discard(usize);

impl ObjSink for Discard {
    fn material_library(&mut self, _file_name: &str) {}

    fn mesh(&mut self, mesh: ParsedMesh) {
        self.0 += mesh.data.vertex_count;
    }
}

/// A grid of `size` x `size` quads split into `objects` objects
fn grid_obj(size: usize, objects: usize) -> String {
    let mut text = String::new();
    for y in 0..=size {
        for x in 0..=size {
            let _ = writeln!(text, "v {} {} 0", x, y);
            let _ = writeln!(text, "vt {} {}", x as f32 / size as f32, y as f32 / size as f32);
        }
    }
    text.push_str("vn 0 0 1\n");

    let rows_per_object = (size / objects).max(1);
    for y in 0..size {
        if y % rows_per_object == 0 {
            let _ = writeln!(text, "o part_{}\nusemtl grid", y / rows_per_object);
        }
        for x in 0..size {
            let a = y * (size + 1) + x + 1;
            let (b, c, d) = (a + 1, a + size + 2, a + size + 1);
            let _ = writeln!(text, "f {a}/{a}/1 {b}/{b}/1 {c}/{c}/1 {d}/{d}/1");
        }
    }
    text
}

fn obj_parse_benchmark(c: &mut Criterion) {
    let text = grid_obj(128, 8);
    let mut group = c.benchmark_group("obj");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("parse_grid_128", |b| {
        b.iter(|| {
            let mut sink = Discard(0);
            let mut parser = ObjParser::new("grid.obj", "grid");
            for (i, line) in text.lines().enumerate() {
                parser.feed_line(i + 1, line, &mut sink);
            }
            parser.finish(&mut sink);
            black_box(sink.0)
        })
    });
    group.finish();

    c.bench_function("parse_face_hexagon", |b| {
        b.iter(|| black_box(parse_face("1/1/1 2/2/1 3/3/1 4/4/1 5/5/1 6/6/1")))
    });
}

criterion_group!(benches, obj_parse_benchmark);
criterion_main!(benches);
