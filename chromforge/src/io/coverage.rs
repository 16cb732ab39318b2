//! Sparse coverage input and the dense per-base materializer.
//!
//! Coverage files are tab-separated `chrom start end value` lines, sorted by
//! start within each chromosome. Bases not covered by any record are zero,
//! but downstream consumers assume full coverage, so gaps are materialized
//! as explicit zero-value records before dense filling.

use std::io::BufRead;

use anyhow::{bail, Context};
use log::{debug, info, warn};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::data_structs::typedef::{CoverageType, PosType, SeqName};
use crate::data_structs::{DenseTrack, Genome};
use crate::io::store::ChromStore;
use crate::utils::THREAD_POOL;

/// One record of a sparse coverage file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageRecord {
    pub chrom: SeqName,
    pub start: PosType,
    pub end:   PosType,
    pub value: CoverageType,
}

impl CoverageRecord {
    pub fn new(
        chrom: SeqName,
        start: PosType,
        end: PosType,
        value: CoverageType,
    ) -> Self {
        Self {
            chrom,
            start,
            end,
            value,
        }
    }
}

/// Parses a coverage stream. Comment and `track` header lines are skipped;
/// any other malformed line aborts the parse, since a broken coverage table
/// usually signals a misconfigured pipeline.
pub fn read_coverage<R: BufRead>(reader: R) -> anyhow::Result<Vec<CoverageRecord>> {
    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read coverage line")?;
        if line.is_empty() || line.starts_with('#') || line.starts_with("track") {
            continue;
        }
        let mut fields = line.split('\t');
        let parse_err = || format!("Malformed coverage record on line {}", lineno + 1);
        let chrom = fields
            .next()
            .filter(|f| !f.is_empty())
            .with_context(parse_err)?;
        let start = fields
            .next()
            .and_then(|f| f.parse::<PosType>().ok())
            .with_context(parse_err)?;
        let end = fields
            .next()
            .and_then(|f| f.parse::<PosType>().ok())
            .with_context(parse_err)?;
        let value = fields
            .next()
            .and_then(|f| f.trim_end().parse::<CoverageType>().ok())
            .with_context(parse_err)?;
        if start >= end {
            bail!("Empty coverage interval on line {}", lineno + 1);
        }
        records.push(CoverageRecord::new(SeqName::from(chrom), start, end, value));
    }
    Ok(records)
}

/// Materializes every gap between consecutive same-chromosome records as an
/// explicit zero-value record. The running cursor resets to zero on every
/// chromosome switch, so a chromosome whose first record starts past zero
/// gets a leading zero record as well.
pub fn fill_gaps(records: &[CoverageRecord]) -> anyhow::Result<Vec<CoverageRecord>> {
    let mut filled = Vec::with_capacity(records.len());
    let mut current_chrom: Option<&SeqName> = None;
    let mut cursor: PosType = 0;

    for record in records {
        if current_chrom != Some(&record.chrom) {
            current_chrom = Some(&record.chrom);
            cursor = 0;
        }
        if record.start < cursor {
            bail!(
                "Coverage records for {} are not sorted: {} < {}",
                record.chrom,
                record.start,
                cursor
            );
        }
        if record.start > cursor {
            filled.push(CoverageRecord::new(
                record.chrom.clone(),
                cursor,
                record.start,
                0,
            ));
        }
        filled.push(record.clone());
        cursor = record.end;
    }
    Ok(filled)
}

/// Fills one chromosome's gap-free record run into a dense array.
///
/// Each record expands to an independent constant-value segment; segments are
/// computed on the shared worker pool and concatenated in the original record
/// order, whatever order the workers finish in. The result length equals the
/// end of the last record.
pub fn materialize_chrom(records: &[CoverageRecord]) -> anyhow::Result<DenseTrack<CoverageType>> {
    if records.is_empty() {
        return Ok(DenseTrack::new(Vec::new()));
    }
    let mut cursor = records[0].start;
    if cursor != 0 {
        bail!("Chromosome records must start at zero; run fill_gaps first");
    }
    for record in records {
        if record.start != cursor {
            bail!(
                "Gap or overlap in records for {} at position {}",
                record.chrom,
                cursor
            );
        }
        cursor = record.end;
    }

    let segments: Vec<Vec<CoverageType>> = THREAD_POOL.install(|| {
        records
            .par_iter()
            .map(|record| vec![record.value; (record.end - record.start) as usize])
            .collect()
    });

    let total = segments.iter().map(Vec::len).sum();
    let mut values = Vec::with_capacity(total);
    for segment in segments {
        values.extend(segment);
    }
    Ok(DenseTrack::new(values))
}

/// Reads a full coverage stream into a store, one dense track per
/// chromosome.
///
/// Alternate contigs (names containing `_`) are skipped. When a genome is
/// supplied, every track is padded with zeros to the full chromosome length
/// and unknown chromosomes are rejected.
pub fn coverage_to_store<R, S>(
    reader: R,
    store: &mut S,
    genome: Option<&Genome>,
) -> anyhow::Result<()>
where
    R: BufRead,
    S: ChromStore<CoverageType>, {
    let records = read_coverage(reader)?;
    let filled = fill_gaps(&records)?;

    let mut chrom_runs: Vec<(SeqName, Vec<CoverageRecord>)> = Vec::new();
    for record in filled {
        match chrom_runs.last_mut() {
            Some((chrom, run)) if *chrom == record.chrom => run.push(record),
            _ => {
                let chrom = record.chrom.clone();
                chrom_runs.push((chrom, vec![record]));
            },
        }
    }

    for (chrom, run) in chrom_runs {
        if chrom.contains('_') {
            debug!("Skipping alternate contig {}", chrom);
            continue;
        }
        let mut track = materialize_chrom(&run)?;
        if let Some(genome) = genome {
            let Some(chr_length) = genome.length_of(&chrom) else {
                warn!("Chromosome {} is not part of the genome, skipping", chrom);
                continue;
            };
            if track.len() > chr_length {
                bail!(
                    "Coverage for {} extends past chromosome length {}",
                    chrom,
                    chr_length
                );
            }
            track.pad_to(chr_length);
        }
        info!("Materialized {} ({} bp)", chrom, track.len());
        store.write(&chrom, track, Default::default())?;
    }
    Ok(())
}
