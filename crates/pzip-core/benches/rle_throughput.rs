use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use pzip_core::{
    BufferSizing, ChunkRange, EncoderConfig, FileEncoder, RECORD_LEN, WriteOrder, encode_range,
    encode_runs,
};

const INPUT_LEN: usize = 4 * 1024 * 1024;

fn long_runs() -> Vec<u8> {
    (0..INPUT_LEN).map(|index| (index / 4096) as u8).collect()
}

fn no_runs() -> Vec<u8> {
    (0..INPUT_LEN).map(|index| (index % 251) as u8).collect()
}

fn bench_codec(c: &mut Criterion) {
    let runny = long_runs();
    let noisy = no_runs();
    let range = ChunkRange::new(0, INPUT_LEN);

    let mut group = c.benchmark_group("rle_codec");
    group.throughput(Throughput::Bytes(INPUT_LEN as u64));

    group.bench_function("long_runs_4mb", |b| b.iter(|| encode_runs(black_box(&runny))));
    group.bench_function("no_runs_worst_case_4mb", |b| {
        b.iter(|| encode_range(black_box(&noisy), range, BufferSizing::WorstCase))
    });
    group.bench_function("no_runs_incremental_4mb", |b| {
        b.iter(|| encode_range(black_box(&noisy), range, BufferSizing::Incremental))
    });

    group.finish();
}

fn bench_fanout(c: &mut Criterion) {
    let data = no_runs();
    let mut group = c.benchmark_group("file_encoder");
    group.throughput(Throughput::Bytes(INPUT_LEN as u64));

    for workers in [1usize, 2, 4, 8] {
        for order in [WriteOrder::ChunkIndex, WriteOrder::Completion] {
            let encoder = FileEncoder::new(EncoderConfig::new(workers).with_write_order(order));
            let id = BenchmarkId::new(format!("{order:?}"), workers);
            group.bench_with_input(id, &data, |b, data| {
                b.iter(|| {
                    encoder
                        .encode_span_to(black_box(data), Vec::with_capacity(data.len() * RECORD_LEN))
                        .map(|(output, _)| output.len())
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_fanout);
criterion_main!(benches);
