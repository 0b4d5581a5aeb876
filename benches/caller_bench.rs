//! Streaming caller throughput

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use duplexcall::genomics::{AlignedRead, CigarOp, CigarOpKind, InMemoryReference};
use duplexcall::{CallerConfig, StreamingVariantCaller};

const CONTIG_LEN: usize = 20_000;
const READ_LEN: usize = 100;

fn synthetic_reads(contig: &[u8]) -> Vec<AlignedRead> {
    (0..CONTIG_LEN - READ_LEN)
        .step_by(5)
        .enumerate()
        .map(|(counter, start)| {
            let mut bases = contig[start..start + READ_LEN].to_vec();
            // Seed a recurring alternate every 500 bases.
            if (start..start + READ_LEN).contains(&(start / 500 * 500 + 250)) && counter % 3 == 0 {
                let offset = start / 500 * 500 + 250 - start;
                bases[offset] = b'A';
            }
            let strand = if counter % 2 == 0 { '+' } else { '-' };
            AlignedRead::new(
                format!("BENCH:{strand}:{}:{}", 1 + counter % 5, counter / 2),
                "chr1",
                start as u64,
                60,
                vec![CigarOp::new(CigarOpKind::Match, READ_LEN as u32)],
                bases,
                vec![35; READ_LEN],
                counter % 2 == 1,
            )
        })
        .collect()
}

fn benchmark_streaming_caller(c: &mut Criterion) {
    let contig: Vec<u8> = b"ACGTTGCA".iter().copied().cycle().take(CONTIG_LEN).collect();
    let reference = InMemoryReference::new("bench.fa").with_contig("chr1", &contig);
    let reads = synthetic_reads(&contig);
    let config = CallerConfig::default().with_retention_window(200);

    let mut group = c.benchmark_group("streaming_caller");
    group.throughput(Throughput::Elements(reads.len() as u64));
    group.bench_function("call_variants", |b| {
        b.iter(|| {
            let caller = StreamingVariantCaller::new(reference.clone(), config.clone())
                .expect("caller initialises");
            black_box(caller.call_variants(reads.clone()).expect("calling succeeds"))
        });
    });
    group.finish();
}

criterion_group!(benches, benchmark_streaming_caller);
criterion_main!(benches);
