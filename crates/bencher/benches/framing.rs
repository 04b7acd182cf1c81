use bencher::{TestCase, TestFile};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use micro_sock::codec::{tokenize, Delimiter};
use micro_sock::config::WindowConfig;
use micro_sock::stream::Multicast;
use micro_sock::window::{HeaderWindow, TailSplit};
use std::hint::black_box;

static SMALL_HEADER: TestFile = TestFile::new("get_small.txt", include_str!("../resources/request/get_small.txt"));
static LARGE_HEADER: TestFile = TestFile::new("get_large.txt", include_str!("../resources/request/get_large.txt"));

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::normal("small_header", SMALL_HEADER),
        TestCase::small("large_header_small_reads", LARGE_HEADER),
        TestCase::normal("large_header", LARGE_HEADER),
        TestCase::large("large_header_large_reads", LARGE_HEADER),
    ]
}

// header lines must not straddle two reads
fn create_window_cases() -> Vec<TestCase> {
    vec![TestCase::normal("small_header", SMALL_HEADER), TestCase::large("large_header", LARGE_HEADER)]
}

fn benchmark_tokenizer(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("line_tokenizer");

    for case in create_test_cases() {
        group.throughput(Throughput::Bytes(case.file().content().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter_batched(
                || case.chunks(),
                |chunks| black_box(tokenize(chunks, Delimiter::line()).count()),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_header_window(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("header_window");
    let config = WindowConfig::default();

    for case in create_window_cases() {
        group.throughput(Throughput::Bytes(case.file().content().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter_batched(
                || case.chunks(),
                |chunks| {
                    let (window, pending) = HeaderWindow::new(&config);
                    let (tail_split, tail) = TailSplit::new(window.boundary());
                    let mut multicast = Multicast::new();
                    multicast.subscribe(window).subscribe(tail_split);
                    multicast.drive(tokenize(chunks, Delimiter::line())).expect("input should be a valid request header");

                    let record = pending.wait().expect("input should be a valid request header");
                    black_box((record, tail.count()));
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(framing, benchmark_tokenizer, benchmark_header_window);
criterion_main!(framing);
