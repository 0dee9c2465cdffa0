use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use pipeline_log_stream::{decode, Reassembler};

fn summary_stream(tokens: usize) -> Vec<u8> {
    let mut body = String::from("data: {\"type\": \"status\", \"message\": \"Processing logs...\"}\n\n");
    for i in 0..tokens {
        body.push_str(&format!(
            "data: {{\"type\": \"token\", \"content\": \"word{i} \"}}\n\n"
        ));
    }
    body.push_str("data: {\"type\": \"complete\", \"message\": \"Summary generation complete\"}\n\n");
    body.into_bytes()
}

fn bench_reassemble_and_decode(c: &mut Criterion) {
    let body = summary_stream(2_000);
    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Bytes(body.len() as u64));

    for chunk_size in [7usize, 64, 4096] {
        group.bench_function(format!("reassemble_decode.chunk_{chunk_size}"), |b| {
            b.iter(|| {
                let mut reassembler = Reassembler::new();
                let mut frames = 0usize;
                for chunk in body.chunks(chunk_size) {
                    frames += reassembler
                        .ingest(chunk)
                        .filter(|block| decode(block.as_str()).is_ok())
                        .count();
                }
                black_box(frames)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reassemble_and_decode);
criterion_main!(benches);
