//! Batch driver: read candidates, align on the worker pool, write results.
//!
//! Each batch is pre-filtered on the calling thread, then the surviving reads
//! are partitioned round-robin across `n_threads` partitions. Every partition
//! is aligned on one rayon worker with that thread's workspace, and the
//! partition outputs are merged back by taking one record per partition in
//! partition order, which restores input order.

use rayon::prelude::*;
use std::io::Write;

use super::align_opt::AlignOpt;
use super::filters::{PrefilterStats, ResolvedRange, prefilter_read};
use super::orchestrator::{AlignStats, CandidateAligner};
use crate::core::alignment::scoring::ScoringModel;
use crate::core::alignment::types::AlignedRead;
use crate::core::alignment::workspace::with_workspace;
use crate::core::io::aligned_output::write_aligned_read;
use crate::core::io::candidates::{CandidateRead, write_candidate_read};
use crate::core::io::reference::ReferenceSource;
use crate::core::utils::Stopwatch;
use crate::error::Result;

/// Totals of a run. `aligned + not_aligned == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignSummary {
    pub total: usize,
    pub aligned: usize,
    pub not_aligned: usize,
    /// Entries written across all aligned reads
    pub entries: usize,
    pub prefilter: PrefilterStats,
    pub stats: AlignStats,
}

/// Outputs of one batch, each in input order.
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub aligned: Vec<AlignedRead>,
    pub not_aligned: Vec<CandidateRead>,
}

/// Split `0..len` round-robin into `partitions` index lists.
fn partition_round_robin(len: usize, partitions: usize) -> Vec<Vec<usize>> {
    let mut parts: Vec<Vec<usize>> = (0..partitions)
        .map(|_| Vec::with_capacity(len / partitions + 1))
        .collect();
    for i in 0..len {
        parts[i % partitions].push(i);
    }
    parts
}

/// Inverse of [`partition_round_robin`]: take one item per partition, in
/// partition order, until a partition runs dry.
fn merge_round_robin<T>(partitions: Vec<Vec<T>>) -> Vec<T> {
    let total = partitions.iter().map(Vec::len).sum();
    let mut iters: Vec<_> = partitions.into_iter().map(Vec::into_iter).collect();
    let mut merged = Vec::with_capacity(total);
    'rounds: loop {
        for it in iters.iter_mut() {
            match it.next() {
                Some(item) => merged.push(item),
                None => break 'rounds,
            }
        }
    }
    merged
}

/// Align one batch of reads.
pub fn align_batch<R: ReferenceSource + ?Sized>(
    reads: Vec<CandidateRead>,
    aligner: &CandidateAligner<'_, R>,
    range: Option<&ResolvedRange>,
    opt: &AlignOpt,
    summary: &mut AlignSummary,
) -> Result<BatchOutput> {
    summary.total += reads.len();

    // Pre-filter, remembering input order for the not-aligned output
    let mut to_align: Vec<(usize, CandidateRead)> = Vec::with_capacity(reads.len());
    let mut not_aligned: Vec<(usize, CandidateRead)> = Vec::new();
    for (idx, mut read) in reads.into_iter().enumerate() {
        if prefilter_read(&mut read, range, opt.max_num_matches, &mut summary.prefilter) {
            to_align.push((idx, read));
        } else {
            not_aligned.push((idx, read));
        }
    }
    let filtered = not_aligned.len();

    let n_partitions = opt.n_threads.max(1).min(to_align.len().max(1));
    let partitions = partition_round_robin(to_align.len(), n_partitions);

    let results: Vec<Result<(Vec<AlignedRead>, AlignStats)>> = partitions
        .par_iter()
        .map(|indices| {
            with_workspace(|ws| -> Result<(Vec<AlignedRead>, AlignStats)> {
                let mut stats = AlignStats::default();
                let aligned = indices
                    .iter()
                    .map(|&i| aligner.align_read(&to_align[i].1, ws, &mut stats))
                    .collect::<Result<Vec<_>>>()?;
                Ok((aligned, stats))
            })
        })
        .collect();

    let mut per_partition = Vec::with_capacity(results.len());
    for result in results {
        let (aligned, stats) = result?;
        summary.stats.merge(&stats);
        per_partition.push(aligned);
    }
    let merged = merge_round_robin(per_partition);

    let mut output = BatchOutput::default();
    for (aligned, (idx, read)) in merged.into_iter().zip(to_align) {
        let entries: usize = aligned.ends.iter().map(|end| end.entries.len()).sum();
        if entries > 0 {
            summary.entries += entries;
            output.aligned.push(aligned);
        } else {
            log::debug!("{}: no candidate could be aligned", read.name);
            not_aligned.push((idx, read));
        }
    }
    not_aligned.sort_by_key(|(idx, _)| *idx);

    summary.aligned += output.aligned.len();
    summary.not_aligned += not_aligned.len();
    log::debug!(
        "Batch: {} aligned, {} filtered before alignment, {} without alignments",
        output.aligned.len(),
        filtered,
        not_aligned.len() - filtered
    );
    output.not_aligned = not_aligned.into_iter().map(|(_, read)| read).collect();
    Ok(output)
}

/// Align every read of `reads` and write the results.
///
/// Aligned reads go to `out`; reads that could not be aligned go to
/// `unaligned` in the candidate format, or are only counted when it is
/// `None`.
pub fn run_alignment<R, I>(
    reads: I,
    reference: &R,
    model: &ScoringModel,
    opt: &AlignOpt,
    out: &mut dyn Write,
    mut unaligned: Option<&mut dyn Write>,
) -> Result<AlignSummary>
where
    R: ReferenceSource + ?Sized,
    I: IntoIterator<Item = Result<CandidateRead>>,
{
    let range = opt
        .range
        .as_ref()
        .map(|r| ResolvedRange::resolve(r, reference))
        .transpose()?;
    let aligner = CandidateAligner::new(reference, model, opt.candidate_params());

    let mut summary = AlignSummary::default();
    let mut reads = reads.into_iter();
    let (mut read_secs, mut align_secs, mut write_secs) = (0.0, 0.0, 0.0);
    let mut clock = Stopwatch::start();
    let mut batches = 0usize;

    loop {
        let batch = reads
            .by_ref()
            .take(opt.batch_size)
            .collect::<Result<Vec<_>>>()?;
        read_secs += clock.lap();
        if batch.is_empty() {
            break;
        }
        batches += 1;
        log::info!("Read {} candidate records", batch.len());

        let output = align_batch(batch, &aligner, range.as_ref(), opt, &mut summary)?;
        align_secs += clock.lap();

        for read in &output.aligned {
            write_aligned_read(&mut *out, read, reference, opt.space)?;
        }
        if let Some(sink) = unaligned.as_deref_mut() {
            for read in &output.not_aligned {
                write_candidate_read(&mut *sink, read, reference)?;
            }
        }
        write_secs += clock.lap();
    }

    out.flush()?;
    if let Some(sink) = unaligned.as_deref_mut() {
        sink.flush()?;
    }

    log::info!(
        "Processed {} reads in {} batches: {} aligned ({} entries), {} not aligned",
        summary.total,
        batches,
        summary.aligned,
        summary.entries,
        summary.not_aligned
    );
    let s = &summary.stats;
    log::debug!(
        "Candidates: {} exact, {} ungapped, {} gapped, {} pruned, {} short windows, {} unresolved",
        s.exact,
        s.ungapped,
        s.gapped,
        s.pruned,
        s.short_windows,
        s.unresolved
    );
    if summary.prefilter.out_of_range > 0 || summary.prefilter.cleared_ends > 0 {
        log::info!(
            "Pre-filter removed {} out-of-range candidates and cleared {} ends over the candidate limit",
            summary.prefilter.out_of_range,
            summary.prefilter.cleared_ends
        );
    }
    if opt.timing {
        log::info!("Time reading candidates: {:.3} sec", read_secs);
        log::info!("Time aligning: {:.3} sec", align_secs);
        log::info!("Time writing output: {:.3} sec", write_secs);
    }
    Ok(summary)
}
