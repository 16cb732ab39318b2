//! Lossy dynamic-bin track compression.
//!
//! Signal-dependent smoothing: high-signal positions keep single-base
//! resolution while low-signal stretches are averaged over geometrically
//! growing bins. The rung ladder maps signal values to bin sizes; maximal
//! runs of same-rung positions are chopped into bins and each bin is
//! replaced by the mean of the original values it covers. Dense length and
//! coordinates are preserved, only values change.

use anyhow::ensure;
use hashbrown::HashMap;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::statistics::Statistics;

use crate::data_structs::typedef::{PosType, SignalType};
use crate::data_structs::DenseTrack;
use crate::io::store::ChromStore;
use crate::utils::ranges::{mask_to_ranges, split_range_to_bins};

pub const DEFAULT_MAX_BIN_POWER: u32 = 4;
pub const BIN_SIZE_BASE: PosType = 32;
pub const DEFAULT_QC_CUTOFF: f64 = 0.3;
pub const DEFAULT_QC_SEED: u64 = 0;
pub const DEFAULT_QC_SAMPLE_SIZE: usize = 1_000_000;

const NO_COMPRESSION_THRESHOLD: f64 = 0.8;
const MAX_COMPRESSION_THRESHOLD: f64 = 0.3;
const EXP_RESHAPE_FACTOR: f64 = 2.0;

/// One rung of a [`BinLadder`]: values above `threshold` (and below the
/// previous rung's threshold) are smoothed with bins of `bin_size`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rung {
    pub bin_size:  PosType,
    pub threshold: f64,
}

/// A descending ladder of signal thresholds paired with growing bin sizes.
///
/// Classification is total: a value lands on the first rung whose threshold
/// it exceeds, and on the last rung otherwise, so every position is assigned
/// exactly one bin size.
#[derive(Debug, Clone)]
pub struct BinLadder {
    rungs: Vec<Rung>,
}

impl BinLadder {
    pub fn new(rungs: Vec<Rung>) -> anyhow::Result<Self> {
        ensure!(!rungs.is_empty(), "Ladder must have at least one rung");
        ensure!(
            rungs.windows(2).all(|pair| {
                pair[0].threshold > pair[1].threshold
                    && pair[0].bin_size < pair[1].bin_size
            }),
            "Ladder thresholds must strictly descend and bin sizes grow"
        );
        Ok(Self { rungs })
    }

    /// The standard ladder: bin sizes `32^0 ..= 32^max_bin_power` with
    /// thresholds spaced linearly, reshaped exponentially to favour high
    /// resolution, and mapped into the
    /// `[MAX_COMPRESSION_THRESHOLD, NO_COMPRESSION_THRESHOLD]` band.
    pub fn geometric(max_bin_power: u32) -> Self {
        let n_rungs = max_bin_power as usize + 1;
        let rungs = (0..n_rungs)
            .map(|idx| {
                let level = if n_rungs == 1 {
                    1.0
                }
                else {
                    1.0 - idx as f64 / (n_rungs - 1) as f64
                };
                let reshaped = ((level * EXP_RESHAPE_FACTOR).exp2() - 1.0)
                    / (EXP_RESHAPE_FACTOR.exp2() - 1.0);
                Rung {
                    bin_size:  BIN_SIZE_BASE.pow(idx as u32),
                    threshold: reshaped * NO_COMPRESSION_THRESHOLD
                        + (1.0 - reshaped) * MAX_COMPRESSION_THRESHOLD,
                }
            })
            .collect();
        // Monotonicity of the construction makes new() infallible here.
        Self { rungs }
    }

    pub fn rungs(&self) -> &[Rung] {
        &self.rungs
    }

    pub fn n_rungs(&self) -> usize {
        self.rungs.len()
    }

    /// The rung index a signal value belongs to.
    pub fn classify(
        &self,
        value: f64,
    ) -> usize {
        self.rungs
            .iter()
            .position(|rung| value > rung.threshold)
            .unwrap_or(self.rungs.len() - 1)
    }
}

impl Default for BinLadder {
    fn default() -> Self {
        Self::geometric(DEFAULT_MAX_BIN_POWER)
    }
}

/// Compresses one dense track against a ladder.
///
/// Positions on a size-1 rung keep their exact values. For every other rung,
/// maximal runs of consecutive same-rung positions are split into bins of the
/// rung's size (the final bin of a run may be shorter) and each bin is filled
/// with the mean of the original values it spans.
pub fn compress_track(
    track: &DenseTrack<SignalType>,
    ladder: &BinLadder,
) -> DenseTrack<SignalType> {
    let values = track.values();
    let mut compressed = vec![0.0 as SignalType; values.len()];

    let mut rung_indices: Vec<Vec<PosType>> = vec![Vec::new(); ladder.n_rungs()];
    for (idx, value) in values.iter().enumerate() {
        rung_indices[ladder.classify(f64::from(*value))].push(idx as PosType);
    }

    for (rung, indices) in ladder.rungs().iter().zip(&rung_indices) {
        if indices.is_empty() {
            debug!("No positions on the {}bp rung", rung.bin_size);
            continue;
        }
        if rung.bin_size == 1 {
            for &idx in indices {
                compressed[idx as usize] = values[idx as usize];
            }
            continue;
        }
        let ranges = mask_to_ranges(indices);
        for (bin_start, bin_end) in split_range_to_bins(&ranges, rung.bin_size) {
            let (bin_start, bin_end) = (bin_start as usize, bin_end as usize);
            let sum: f64 = values[bin_start..bin_end]
                .iter()
                .map(|v| f64::from(*v))
                .sum();
            let mean = (sum / (bin_end - bin_start) as f64) as SignalType;
            compressed[bin_start..bin_end].fill(mean);
        }
    }

    DenseTrack::new(compressed)
}

/// The background-noise metric: the population standard deviation of the
/// sub-`cutoff` portion of a seeded random sample of the track.
///
/// The seed is an explicit parameter so reruns are reproducible (callers
/// default it to [`DEFAULT_QC_SEED`]). Returns `NaN` when the sample
/// contains no sub-cutoff values; the metric is recorded as-is, undefined
/// noise is itself a quality signal.
pub fn background_noise(
    values: &[SignalType],
    cutoff: f64,
    seed: u64,
    sample_size: usize,
) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let low_values: Vec<f64> = (0..sample_size)
        .map(|_| f64::from(values[rng.gen_range(0..values.len())]))
        .filter(|v| *v < cutoff)
        .collect();
    low_values.population_std_dev()
}

/// Compresses every chromosome of `input` into `output`, recording the
/// background-noise metric per chromosome and its mean as a group attribute.
pub fn compress_store<S, K>(
    input: &S,
    output: &mut K,
    ladder: &BinLadder,
    qc_cutoff: f64,
) -> anyhow::Result<()>
where
    S: ChromStore<SignalType>,
    K: ChromStore<SignalType>, {
    let metric_key = format!("qc_std_{}", qc_cutoff);
    let mut noise_values = Vec::new();

    for chrom in input.chr_names() {
        let track = input.read(&chrom)?;
        let noise = background_noise(
            track.values(),
            qc_cutoff,
            DEFAULT_QC_SEED,
            DEFAULT_QC_SAMPLE_SIZE,
        );
        info!("Compressing {} ({} = {})", chrom, metric_key, noise);
        let compressed = compress_track(&track, ladder);
        let attrs = HashMap::from([(metric_key.clone(), noise)]);
        output.write(&chrom, compressed, attrs)?;
        noise_values.push(noise);
    }

    if !noise_values.is_empty() {
        let mean = noise_values.iter().sum::<f64>() / noise_values.len() as f64;
        output.set_group_attr(&metric_key, mean)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use rstest::rstest;

    use super::*;
    use crate::io::store::MemStore;

    fn two_rung_ladder() -> BinLadder {
        BinLadder::new(vec![
            Rung {
                bin_size:  1,
                threshold: 0.5,
            },
            Rung {
                bin_size:  4,
                threshold: 0.0,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_geometric_ladder_shape() {
        let ladder = BinLadder::geometric(4);
        assert_eq!(ladder.n_rungs(), 5);
        let sizes: Vec<PosType> = ladder.rungs().iter().map(|r| r.bin_size).collect();
        assert_eq!(sizes, vec![1, 32, 1024, 32768, 1048576]);
        assert_approx_eq!(ladder.rungs()[0].threshold, 0.8);
        assert_approx_eq!(ladder.rungs()[4].threshold, 0.3);
        assert!(ladder
            .rungs()
            .windows(2)
            .all(|pair| pair[0].threshold > pair[1].threshold));
    }

    #[test]
    fn test_ladder_rejects_non_descending_thresholds() {
        assert!(BinLadder::new(vec![
            Rung {
                bin_size:  1,
                threshold: 0.3,
            },
            Rung {
                bin_size:  4,
                threshold: 0.5,
            },
        ])
        .is_err());
    }

    #[rstest]
    #[case(0.9, 0)]
    #[case(0.7, 0)]
    #[case(0.5, 1)]
    #[case(0.1, 1)]
    // Not above any threshold: falls on the last rung.
    #[case(0.0, 1)]
    #[case(-1.0, 1)]
    fn test_classification_is_total(
        #[case] value: f64,
        #[case] expected: usize,
    ) {
        assert_eq!(two_rung_ladder().classify(value), expected);
    }

    #[test]
    fn test_compress_track_averages_low_signal_bins() {
        let track = DenseTrack::new(vec![0.7f32, 0.0, 0.1, 0.2, 0.3]);
        let compressed = compress_track(&track, &two_rung_ladder());
        let values = compressed.values();
        // The high-signal position keeps its exact value.
        assert_approx_eq!(values[0], 0.7f32);
        // The low-signal run becomes one bin holding its mean.
        for value in &values[1..] {
            assert_approx_eq!(*value, 0.15f32);
        }
    }

    #[test]
    fn test_compress_track_splits_long_runs_into_bins() {
        let mut raw = vec![0.1f32; 10];
        raw[6] = 0.3;
        let track = DenseTrack::new(raw);
        let compressed = compress_track(&track, &two_rung_ladder());
        let values = compressed.values();
        // One run of 10 low-signal positions: bins [0,4), [4,8), [8,10).
        assert_approx_eq!(values[0], 0.1f32);
        assert_approx_eq!(values[4], 0.15f32);
        assert_approx_eq!(values[8], 0.1f32);
        assert_eq!(values.len(), 10);
    }

    #[test]
    fn test_compress_track_uniform_runs_are_unchanged() {
        // Both runs are already uniform, so averaging is a no-op.
        let track = DenseTrack::new(vec![0.9f32, 0.9, 0.9, 0.9, 0.1, 0.1, 0.1, 0.1]);
        let compressed = compress_track(&track, &two_rung_ladder());
        assert_eq!(compressed.values(), track.values());
    }

    #[test]
    fn test_compress_track_is_idempotent_on_fixture() {
        let track = DenseTrack::new(vec![0.7f32, 0.0, 0.1, 0.2, 0.3]);
        let ladder = two_rung_ladder();
        let once = compress_track(&track, &ladder);
        let twice = compress_track(&once, &ladder);
        assert_eq!(once.values(), twice.values());
    }

    #[rstest]
    #[case(DEFAULT_QC_SEED)]
    #[case(42)]
    fn test_background_noise_constant_low_signal_is_zero(#[case] seed: u64) {
        let noise =
            background_noise(&vec![0.1f32; 64], 0.3, seed, DEFAULT_QC_SAMPLE_SIZE);
        assert_approx_eq!(noise, 0.0);
    }

    #[test]
    fn test_background_noise_without_low_values_is_nan() {
        let noise = background_noise(
            &vec![1.0f32; 64],
            0.3,
            DEFAULT_QC_SEED,
            DEFAULT_QC_SAMPLE_SIZE,
        );
        assert!(noise.is_nan());
    }

    #[test]
    fn test_background_noise_is_deterministic_per_seed() {
        let values: Vec<f32> = (0..1000).map(|i| (i % 7) as f32 / 10.0).collect();
        assert_eq!(
            background_noise(&values, 0.3, 7, 10_000),
            background_noise(&values, 0.3, 7, 10_000)
        );
    }

    #[test]
    fn test_compress_store_records_metrics() {
        let mut input = MemStore::new();
        input
            .write(
                "chr1",
                DenseTrack::new(vec![0.1f32; 100]),
                HashMap::new(),
            )
            .unwrap();
        input
            .write(
                "chr2",
                DenseTrack::new(vec![0.2f32; 100]),
                HashMap::new(),
            )
            .unwrap();

        let mut output = MemStore::new();
        compress_store(&input, &mut output, &BinLadder::default(), 0.3).unwrap();

        assert_eq!(output.chr_names(), vec!["chr1", "chr2"]);
        let attrs = output.chrom_attrs("chr1").unwrap();
        assert_approx_eq!(attrs["qc_std_0.3"], 0.0);
        assert_approx_eq!(output.group_attrs()["qc_std_0.3"], 0.0);
    }
}
