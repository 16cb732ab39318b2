//! Genome partitioning: turns raw loci lists into non-overlapping,
//! length-validated, margin-padded, optionally windowed, exclusion-subtracted
//! region sets.
//!
//! The engine runs a fixed pipeline — load, chromosome filter, exclusion
//! subtraction, optional windowing, validation — and only validated loci are
//! handed out. Loading strategies vary (bed tables, gene models, in-memory
//! tuples, procedural tiling) and are supplied as [`LociLoader`]
//! implementations; everything after loading is shared.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, info, warn};
use rust_lapper::Lapper;

use crate::data_structs::typedef::{PosType, SeqName};
use crate::data_structs::{Genome, Interval, Locus};
use crate::io::loci::{read_bed, read_gff};
use crate::utils::ranges::subtract_with_margin;
use crate::with_field_fn;

pub const DEFAULT_EXCLUSION_MARGIN: PosType = 8192;
pub const DEFAULT_EDGE_BUFFER: PosType = 2048;

/// A strategy for producing the raw loci a partitioning run starts from.
pub trait LociLoader {
    fn load(
        &self,
        genome: &Genome,
    ) -> anyhow::Result<Vec<Interval>>;
}

/// Loads loci from a bed-like `chrom start end [label]` table.
pub struct BedLoci {
    path: PathBuf,
}

impl BedLoci {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl LociLoader for BedLoci {
    fn load(
        &self,
        _genome: &Genome,
    ) -> anyhow::Result<Vec<Interval>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open loci file {}", self.path.display()))?;
        read_bed(file)
    }
}

/// Loads gene-model regions from a GFF3 annotation. Strand is part of the
/// input but never flips coordinates (region extraction is strand-agnostic).
pub struct GffLoci {
    path: PathBuf,
}

impl GffLoci {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl LociLoader for GffLoci {
    fn load(
        &self,
        _genome: &Genome,
    ) -> anyhow::Result<Vec<Interval>> {
        let file = File::open(&self.path).with_context(|| {
            format!("Failed to open annotation file {}", self.path.display())
        })?;
        read_gff(file)
    }
}

/// Uses an in-memory list of `(chrom, start, end)` triples as loci.
pub struct TupleLoci {
    loci: Vec<(SeqName, PosType, PosType)>,
}

impl TupleLoci {
    pub fn new(loci: Vec<(SeqName, PosType, PosType)>) -> Self {
        Self { loci }
    }
}

impl LociLoader for TupleLoci {
    fn load(
        &self,
        _genome: &Genome,
    ) -> anyhow::Result<Vec<Interval>> {
        Ok(self
            .loci
            .iter()
            .map(|(chrom, start, end)| Interval::new(chrom.clone(), *start, *end))
            .collect())
    }
}

/// Tiles every chromosome with fixed-size, fixed-step windows, leaving
/// `chr_margin` untouched at each chromosome end.
pub struct TiledLoci {
    window_size: PosType,
    step_size:   PosType,
    chr_margin:  PosType,
}

impl TiledLoci {
    pub fn new(
        window_size: PosType,
        step_size: PosType,
        chr_margin: PosType,
    ) -> Self {
        assert!(window_size > 0 && step_size > 0);
        Self {
            window_size,
            step_size,
            chr_margin,
        }
    }
}

impl LociLoader for TiledLoci {
    fn load(
        &self,
        genome: &Genome,
    ) -> anyhow::Result<Vec<Interval>> {
        let mut loci = Vec::new();
        for (chrom, chr_length) in genome.iter() {
            let Some(last_start) = chr_length
                .checked_sub(self.window_size + self.chr_margin)
                .filter(|&last| last > self.chr_margin)
            else {
                debug!("Chromosome {} is too short to tile, skipping", chrom);
                continue;
            };
            let mut start = self.chr_margin;
            while start < last_start {
                loci.push(Interval::new(chrom.clone(), start, start + self.window_size));
                start += self.step_size;
            }
        }
        info!("Generated {} tiled loci", loci.len());
        Ok(loci)
    }
}

/// Regions to subtract from candidate loci. Overlap queries use
/// margin-widened spans, so a locus merely near an exclusion (within the
/// margin) is still fragmented.
struct ExclusionSet {
    margin:  PosType,
    lappers: HashMap<SeqName, Lapper<PosType, (PosType, PosType)>>,
}

impl ExclusionSet {
    fn build(
        exclusions: &[Interval],
        margin: PosType,
    ) -> Self {
        let mut per_chrom: HashMap<SeqName, Vec<rust_lapper::Interval<PosType, _>>> =
            HashMap::new();
        for ex in exclusions {
            let widened = ex.widened(margin);
            per_chrom
                .entry(ex.chrom().clone())
                .or_default()
                .push(rust_lapper::Interval {
                    start: widened.start(),
                    stop:  widened.end(),
                    val:   (ex.start(), ex.end()),
                });
        }
        let lappers = per_chrom
            .into_iter()
            .map(|(chrom, intervals)| (chrom, Lapper::new(intervals)))
            .collect();
        Self { margin, lappers }
    }

    /// Raw exclusions whose margin-widened span overlaps the locus.
    fn overlapping(
        &self,
        locus: &Interval,
    ) -> Vec<Interval> {
        let Some(lapper) = self.lappers.get(locus.chrom()) else {
            return Vec::new();
        };
        lapper
            .find(locus.start(), locus.end())
            .map(|hit| Interval::new(locus.chrom().clone(), hit.val.0, hit.val.1))
            .sorted_by_key(Interval::start)
            .collect()
    }
}

/// Windowing parameters for sliding-window partitioning.
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    pub window_size: PosType,
    pub step_size:   PosType,
    pub edge_buffer: PosType,
}

impl WindowConfig {
    pub fn new(
        window_size: PosType,
        step_size: PosType,
    ) -> Self {
        assert!(window_size > 0 && step_size > 0);
        Self {
            window_size,
            step_size,
            edge_buffer: DEFAULT_EDGE_BUFFER,
        }
    }

    with_field_fn!(edge_buffer, PosType);
}

/// The partitioning engine. Construct with a genome and exclusion list,
/// configure margins and windowing, then run [`Self::partition`] with a
/// loading strategy.
pub struct GenomePartitioner<'g> {
    genome:           &'g Genome,
    excluded:         Vec<Interval>,
    exclusion_margin: PosType,
    chr_margin:       Option<PosType>,
    window:           Option<WindowConfig>,
}

impl<'g> GenomePartitioner<'g> {
    pub fn new(
        genome: &'g Genome,
        excluded: Vec<Interval>,
    ) -> Self {
        Self {
            genome,
            excluded,
            exclusion_margin: DEFAULT_EXCLUSION_MARGIN,
            chr_margin: None,
            window: None,
        }
    }

    with_field_fn!(exclusion_margin, PosType);

    with_field_fn!(window, Option<WindowConfig>);

    // Also excludes this many bases at the start and end of every
    // chromosome.
    with_field_fn!(chr_margin, Option<PosType>);

    /// Runs the full pipeline: load, chromosome filter, exclusion
    /// subtraction, optional windowing, validation.
    pub fn partition<L: LociLoader>(
        &self,
        loader: &L,
    ) -> anyhow::Result<Partition> {
        let loaded = loader.load(self.genome)?;
        info!("Loaded {} loci", loaded.len());

        let (on_chrom, off_chrom) = self.filter_chromosomes(loaded);
        let exclusions = self.build_exclusions();
        let surviving = self.apply_exclusions(on_chrom, &exclusions);
        let loci = match self.window {
            Some(config) => self.window_loci(surviving, config)?,
            None => surviving
                .into_iter()
                .enumerate()
                .map(|(idx, interval)| Locus::new(interval, format!("region_{idx}")))
                .collect(),
        };
        self.validate(&loci)?;

        info!("Partition produced {} validated loci", loci.len());
        Ok(Partition {
            loci,
            n_off_chrom: off_chrom.len(),
        })
    }

    /// Splits loci into those on known chromosomes and those discarded.
    /// Discarded loci are only kept for diagnostics; they never reach
    /// validation.
    fn filter_chromosomes(
        &self,
        loaded: Vec<Interval>,
    ) -> (Vec<Interval>, Vec<Interval>) {
        let (on_chrom, off_chrom): (Vec<_>, Vec<_>) = loaded
            .into_iter()
            .partition(|locus| self.genome.contains(locus.chrom()));
        for locus in &off_chrom {
            warn!("Off-chromosome locus discarded: {}", locus);
        }
        (on_chrom, off_chrom)
    }

    fn build_exclusions(&self) -> ExclusionSet {
        let mut excluded = self.excluded.clone();
        if let Some(margin) = self.chr_margin {
            for (chrom, chr_length) in self.genome.iter() {
                if chr_length <= 2 * margin {
                    warn!("Chromosome {} is shorter than twice the margin", chrom);
                    continue;
                }
                excluded.push(
                    Interval::new(chrom.clone(), 0, margin)
                        .with_label(Some("chr_start".into())),
                );
                excluded.push(
                    Interval::new(chrom.clone(), chr_length - margin, chr_length)
                        .with_label(Some("chr_end".into())),
                );
            }
        }
        ExclusionSet::build(&excluded, self.exclusion_margin)
    }

    /// Replaces each locus overlapping a (widened) exclusion with its
    /// uncovered remainder; fully covered loci are dropped.
    fn apply_exclusions(
        &self,
        loci: Vec<Interval>,
        exclusions: &ExclusionSet,
    ) -> Vec<Interval> {
        let mut surviving = Vec::with_capacity(loci.len());
        let mut n_fragmented = 0usize;
        let mut n_dropped = 0usize;
        for locus in loci {
            let overlapping = exclusions.overlapping(&locus);
            if overlapping.is_empty() {
                surviving.push(locus);
                continue;
            }
            let remainder =
                subtract_with_margin(&locus, &overlapping, exclusions.margin);
            if remainder.is_empty() {
                debug!("Locus fully covered by exclusions: {}", locus);
                n_dropped += 1;
            }
            else {
                n_fragmented += 1;
            }
            surviving.extend(remainder);
        }
        if n_fragmented + n_dropped > 0 {
            info!(
                "Exclusion filter fragmented {} loci, dropped {}",
                n_fragmented, n_dropped
            );
        }
        surviving
    }

    /// Expands each locus by the edge buffer (clamped to the chromosome),
    /// then tiles it with fixed-size, fixed-step windows. Windows may extend
    /// past the locus' own expanded end by design; they are truncated only at
    /// the chromosome boundary.
    fn window_loci(
        &self,
        loci: Vec<Interval>,
        config: WindowConfig,
    ) -> anyhow::Result<Vec<Locus>> {
        let mut windows = Vec::new();
        for (outer_idx, locus) in loci.iter().enumerate() {
            let chr_length = self
                .genome
                .length_of(locus.chrom())
                .with_context(|| format!("Unknown chromosome {}", locus.chrom()))?;
            let start = locus.start().saturating_sub(config.edge_buffer);
            let end = locus
                .end()
                .saturating_add(config.edge_buffer)
                .min(chr_length);

            let mut emit = |inner_idx: usize, window_start: PosType| {
                let window_end = (window_start + config.window_size).min(chr_length);
                windows.push(Locus::new(
                    Interval::new(locus.chrom().clone(), window_start, window_end),
                    format!("region_{outer_idx}_{inner_idx}"),
                ));
            };

            if end - start > config.window_size {
                let n_windows = (end - start) / config.step_size;
                for inner_idx in 0..n_windows {
                    emit(
                        inner_idx as usize,
                        start + inner_idx * config.step_size,
                    );
                }
            }
            else {
                emit(0, start);
            }
        }
        Ok(windows)
    }

    /// Final consistency gate: every locus must lie within its chromosome.
    /// A violation aborts the run; handing a region that reads past a
    /// chromosome boundary to a consumer corrupts downstream bookkeeping.
    fn validate(
        &self,
        loci: &[Locus],
    ) -> anyhow::Result<()> {
        for locus in loci {
            self.genome
                .check_interval(locus.interval())
                .with_context(|| format!("Validation failed for {}", locus))?;
        }
        debug!("All {} loci are within chromosome bounds", loci.len());
        Ok(())
    }
}

/// The validated result of a partitioning run.
#[derive(Debug, Clone)]
pub struct Partition {
    loci:        Vec<Locus>,
    n_off_chrom: usize,
}

impl Partition {
    pub fn loci(&self) -> &[Locus] {
        &self.loci
    }

    pub fn len(&self) -> usize {
        self.loci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }

    pub fn n_off_chrom(&self) -> usize {
        self.n_off_chrom
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locus> {
        self.loci.iter()
    }

    /// Writes the loci as a bed-like table with the region id in the fourth
    /// column.
    pub fn export_bed<W: Write>(
        &self,
        mut sink: W,
    ) -> anyhow::Result<()> {
        for locus in &self.loci {
            writeln!(
                sink,
                "{}\t{}\t{}\t{}",
                locus.chrom(),
                locus.start(),
                locus.end(),
                locus.region_id()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genome() -> Genome {
        Genome::from_pairs([("chr1", 1_000_000u64), ("chr2", 500_000u64)])
    }

    fn triples(
        loci: &[(&str, PosType, PosType)]
    ) -> TupleLoci {
        TupleLoci::new(
            loci.iter()
                .map(|(chrom, start, end)| (SeqName::from(*chrom), *start, *end))
                .collect(),
        )
    }

    #[test]
    fn test_off_chromosome_loci_are_discarded() {
        let genome = genome();
        let partitioner = GenomePartitioner::new(&genome, vec![]);
        let partition = partitioner
            .partition(&triples(&[("chr1", 100, 200), ("chrUn", 0, 50)]))
            .unwrap();
        assert_eq!(partition.len(), 1);
        assert_eq!(partition.n_off_chrom(), 1);
        assert_eq!(partition.loci()[0].chrom().as_str(), "chr1");
    }

    #[test]
    fn test_region_ids_are_sequential_without_windowing() {
        let genome = genome();
        let partitioner = GenomePartitioner::new(&genome, vec![]);
        let partition = partitioner
            .partition(&triples(&[("chr1", 0, 100), ("chr1", 200, 300)]))
            .unwrap();
        let ids: Vec<&str> = partition
            .iter()
            .map(Locus::region_id)
            .collect();
        assert_eq!(ids, vec!["region_0", "region_1"]);
    }

    #[test]
    fn test_exclusion_fragments_nearby_locus() {
        let genome = genome();
        // The exclusion does not touch the locus, but its widened span does.
        let exclusions = vec![Interval::new("chr1".into(), 10_000, 11_000)];
        let partitioner = GenomePartitioner::new(&genome, exclusions)
            .with_exclusion_margin(2_000);
        let partition = partitioner
            .partition(&triples(&[("chr1", 11_500, 20_000)]))
            .unwrap();
        // Remainder starts after the widened exclusion end (11_000 + 2_000).
        assert_eq!(partition.len(), 1);
        assert_eq!(partition.loci()[0].start(), 13_000);
        assert_eq!(partition.loci()[0].end(), 20_000);
    }

    #[test]
    fn test_fully_covered_locus_is_dropped() {
        let genome = genome();
        let exclusions = vec![Interval::new("chr1".into(), 0, 50_000)];
        let partitioner =
            GenomePartitioner::new(&genome, exclusions).with_exclusion_margin(0);
        let partition = partitioner
            .partition(&triples(&[("chr1", 10_000, 20_000)]))
            .unwrap();
        assert!(partition.is_empty());
    }

    #[test]
    fn test_untouched_locus_passes_through() {
        let genome = genome();
        let exclusions = vec![Interval::new("chr2".into(), 0, 100)];
        let partitioner = GenomePartitioner::new(&genome, exclusions);
        let partition = partitioner
            .partition(&triples(&[("chr1", 100_000, 101_000)]))
            .unwrap();
        assert_eq!(partition.len(), 1);
        assert_eq!(partition.loci()[0].start(), 100_000);
    }

    #[test]
    fn test_windowing_tiles_expanded_locus() {
        let genome = genome();
        let partitioner = GenomePartitioner::new(&genome, vec![]).with_window(Some(
            WindowConfig::new(1000, 500).with_edge_buffer(0),
        ));
        // Expanded length 1600 > 1000: three windows of exactly 1000.
        let partition = partitioner
            .partition(&triples(&[("chr1", 10_000, 11_600)]))
            .unwrap();
        let coords: Vec<(PosType, PosType)> = partition
            .iter()
            .map(|locus| (locus.start(), locus.end()))
            .collect();
        assert_eq!(
            coords,
            vec![(10_000, 11_000), (10_500, 11_500), (11_000, 12_000)]
        );
        let ids: Vec<&str> = partition
            .iter()
            .map(Locus::region_id)
            .collect();
        assert_eq!(ids, vec!["region_0_0", "region_0_1", "region_0_2"]);
    }

    #[test]
    fn test_windowing_short_locus_becomes_one_window() {
        let genome = genome();
        let partitioner = GenomePartitioner::new(&genome, vec![]).with_window(Some(
            WindowConfig::new(1000, 500).with_edge_buffer(100),
        ));
        let partition = partitioner
            .partition(&triples(&[("chr1", 5_000, 5_200)]))
            .unwrap();
        assert_eq!(partition.len(), 1);
        assert_eq!(partition.loci()[0].start(), 4_900);
        assert_eq!(partition.loci()[0].end(), 5_900);
        assert_eq!(partition.loci()[0].region_id(), "region_0_0");
    }

    #[test]
    fn test_windowing_truncates_at_chromosome_end() {
        let genome = Genome::from_pairs([("chr1", 5_300u64)]);
        let partitioner = GenomePartitioner::new(&genome, vec![]).with_window(Some(
            WindowConfig::new(1000, 500).with_edge_buffer(0),
        ));
        let partition = partitioner
            .partition(&triples(&[("chr1", 4_800, 5_100)]))
            .unwrap();
        assert_eq!(partition.len(), 1);
        assert_eq!(partition.loci()[0].end(), 5_300);
    }

    #[test]
    fn test_validation_rejects_out_of_bounds_locus() {
        let genome = Genome::from_pairs([("chr1", 1_000u64)]);
        let partitioner = GenomePartitioner::new(&genome, vec![]);
        assert!(partitioner
            .partition(&triples(&[("chr1", 500, 2_000)]))
            .is_err());
    }

    #[test]
    fn test_chr_margin_excludes_chromosome_ends() {
        let genome = Genome::from_pairs([("chr1", 100_000u64)]);
        let partitioner = GenomePartitioner::new(&genome, vec![])
            .with_exclusion_margin(0)
            .with_chr_margin(Some(10_000));
        let partition = partitioner
            .partition(&triples(&[("chr1", 5_000, 50_000), ("chr1", 95_000, 99_000)]))
            .unwrap();
        // First locus loses its head below the start margin; second is gone.
        assert_eq!(partition.len(), 1);
        assert_eq!(partition.loci()[0].start(), 10_000);
        assert_eq!(partition.loci()[0].end(), 50_000);
    }

    #[test]
    fn test_tiled_loader_respects_margins() {
        let genome = Genome::from_pairs([("chr1", 10_000u64)]);
        let loader = TiledLoci::new(1_000, 1_000, 2_000);
        let loci = loader.load(&genome).unwrap();
        assert!(!loci.is_empty());
        assert!(loci.iter().all(|l| l.start() >= 2_000));
        assert!(loci.iter().all(|l| l.end() <= 8_000));
        assert!(loci.iter().all(|l| l.length() == 1_000));
    }

    #[test]
    fn test_export_bed() {
        let genome = genome();
        let partitioner = GenomePartitioner::new(&genome, vec![]);
        let partition = partitioner
            .partition(&triples(&[("chr1", 0, 100)]))
            .unwrap();
        let mut out = Vec::new();
        partition.export_bed(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "chr1\t0\t100\tregion_0\n");
    }
}
