use std::hint::black_box;

use bencher::{LARGE_REQUEST, SMALL_REQUEST, TestCase};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fast_http::codec::RequestDecoder;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

fn create_test_cases() -> Vec<TestCase> {
    vec![TestCase::small("small_header_decoder", SMALL_REQUEST), TestCase::large("large_header_decoder", LARGE_REQUEST)]
}

fn benchmark_request_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("request_decoder");

    for case in create_test_cases() {
        group.throughput(Throughput::Bytes(case.input().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            let mut request_decoder = RequestDecoder::new();
            b.iter_batched_ref(
                || BytesMut::from(case.input()),
                |bytes_mut| {
                    let header = request_decoder.decode(bytes_mut).expect("input should be valid http request header").unwrap();
                    black_box(header);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(decoder, benchmark_request_decoder);
criterion_main!(decoder);
