// benches/align_perf.rs
// Criterion benchmarks for the per-candidate aligners: ungapped scan,
// banded gapped DP against the unbanded DP, and one read end through the
// full exact -> ungapped -> gapped cascade.

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};

use ferrous_dpalign::core::alignment::bounded::{align_gapped_bounded, align_gapped_full};
use ferrous_dpalign::core::alignment::scoring::{PairScorer, ScoringModel};
use ferrous_dpalign::core::alignment::types::{ReferenceWindow, Space, Strand};
use ferrous_dpalign::core::alignment::ungapped::align_ungapped;
use ferrous_dpalign::core::alignment::workspace::AlignmentWorkspace;
use ferrous_dpalign::core::io::candidates::{Candidate, CandidateEnd};
use ferrous_dpalign::core::io::reference::ReferenceGenome;
use ferrous_dpalign::pipelines::candidate::{AlignOpt, AlignStats, CandidateAligner};

const PADDING: usize = 20;
const BASES: &[u8] = b"ACGT";

fn random_seq(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| BASES[rng.gen_range(0..4)]).collect()
}

/// Read drawn from the middle of `window` with a few substitutions and one
/// single-base deletion, so the gapped DP has something to find.
fn make_pair(len: usize, seed: u64) -> (Vec<u8>, ReferenceWindow) {
    let mut rng = StdRng::seed_from_u64(seed);
    let seq = random_seq(&mut rng, len + 2 * PADDING);
    let mut read = seq[PADDING..PADDING + len + 1].to_vec();
    read.remove(len / 2);
    for _ in 0..len / 25 {
        let i = rng.gen_range(0..len);
        read[i] = BASES[rng.gen_range(0..4)];
    }
    let window = ReferenceWindow {
        contig: 0,
        start: 1,
        strand: Strand::Forward,
        seq,
    };
    (read, window)
}

fn bench_gapped(c: &mut Criterion) {
    let mut group = c.benchmark_group("gapped_dp");
    let model = ScoringModel::default();

    for len in [36usize, 50, 75, 100, 150] {
        let (read, window) = make_pair(len, 0xDEADBEEFCAFEBABE ^ len as u64);
        let scorer = PairScorer::new(&model, Space::Nucleotide, &read, &window.seq);
        let bound = align_ungapped(&scorer, &window, None, 0).map_or(f64::NEG_INFINITY, |e| e.score);

        group.throughput(Throughput::Elements((len * window.len()) as u64));
        group.bench_function(format!("ungapped_len{len}"), |b| {
            b.iter(|| black_box(align_ungapped(&scorer, &window, None, 0)))
        });
        group.bench_function(format!("bounded_len{len}"), |b| {
            b.iter_batched_ref(
                AlignmentWorkspace::new,
                |ws| {
                    let m = ws.matrix_for(read.len(), window.len());
                    black_box(align_gapped_bounded(&scorer, &window, bound, m))
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("full_len{len}"), |b| {
            b.iter_batched_ref(
                AlignmentWorkspace::new,
                |ws| {
                    let m = ws.matrix_for(read.len(), window.len());
                    black_box(align_gapped_full(&scorer, &window, m))
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidate_cascade");
    let model = ScoringModel::default();
    let mut rng = StdRng::seed_from_u64(42);
    let contig = random_seq(&mut rng, 20_000);
    let genome = ReferenceGenome::from_contigs(vec![("chr1", contig.clone())]).unwrap_or_default();
    let opt = AlignOpt::default();
    let aligner = CandidateAligner::new(&genome, &model, opt.candidate_params());

    let len = 50;
    let candidates: Vec<Candidate> = (0..32)
        .map(|_| Candidate {
            contig: 0,
            position: rng.gen_range(100..19_000),
            strand: Strand::Forward,
        })
        .collect();
    let start = candidates[0].position as usize - 1;
    let mut read = contig[start..start + len + 1].to_vec();
    read.remove(len / 3);
    let end = CandidateEnd {
        read,
        qual: None,
        mask: None,
        candidates,
    };

    group.throughput(Throughput::Elements(end.candidates.len() as u64));
    group.bench_function("len50_candidates32", |b| {
        let mut ws = AlignmentWorkspace::new();
        b.iter(|| {
            let mut stats = AlignStats::default();
            black_box(aligner.align_end(&end, &mut ws, &mut stats))
        })
    });

    group.finish();
}

fn configure() -> Criterion {
    Criterion::default().sample_size(20)
}

criterion_group! {
    name = benches;
    config = configure();
    targets = bench_gapped, bench_cascade
}
criterion_main!(benches);
