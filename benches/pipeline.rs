use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vidlsh::{
    band_keys, reduce_sorted, run_local, BandKey, Candidate, CandidatePolicy, LocalOptions,
    LshConfig, Mapper, VideoRecord,
};

/// Shingle set of a typical video: a few hundred ids spread over the space.
fn shingles(seed: u64, len: u64) -> Vec<u64> {
    (0..len).map(|i| (seed * 7_919 + i * 131) % 20_000).collect()
}

fn signature_bench(c: &mut Criterion) {
    let mapper = Mapper::new(&LshConfig::default()).expect("baseline config");
    let set = shingles(1, 300);

    c.bench_function("build_signature_300_shingles_1024_hashes", |b| {
        b.iter(|| black_box(mapper.signature(black_box(&set))));
    });
}

fn band_bench(c: &mut Criterion) {
    let mapper = Mapper::new(&LshConfig::default()).expect("baseline config");
    let sig = mapper.signature(&shingles(2, 300));

    c.bench_function("band_keys_64_bands", |b| {
        b.iter(|| {
            for key in band_keys(mapper.family(), black_box(&sig)) {
                black_box(key);
            }
        });
    });
}

fn reduce_bench(c: &mut Criterion) {
    let cfg = LshConfig::default();
    let mapper = Mapper::new(&cfg).expect("baseline config");
    let base = shingles(3, 300);
    // One hot bucket: 200 near-identical videos sharing band 0.
    let key = BandKey::new(0, 0);
    let group: Vec<_> = (0..200u64)
        .map(|id| {
            let mut set = base.clone();
            set[(id as usize) % set.len()] = 19_999 - id;
            (key, Candidate::new(id, mapper.signature(&set)))
        })
        .collect();

    c.bench_function("reduce_group_200_candidates", |b| {
        b.iter(|| {
            let out = reduce_sorted(&cfg, CandidatePolicy::default(), black_box(group.clone()))
                .expect("valid config");
            black_box(out);
        });
    });
}

fn local_run_bench(c: &mut Criterion) {
    let cfg = LshConfig::default();
    let records: Vec<VideoRecord> = (0..500u64)
        .map(|id| VideoRecord::new(id, shingles(id / 2, 200)))
        .collect();

    c.bench_function("run_local_500_videos", |b| {
        b.iter(|| {
            let out = run_local(
                &cfg,
                CandidatePolicy::default(),
                black_box(&records),
                &LocalOptions::default(),
            )
            .expect("local run");
            black_box(out);
        });
    });
}

criterion_group!(
    benches,
    signature_bench,
    band_bench,
    reduce_bench,
    local_run_bench
);
criterion_main!(benches);
