//! Dosage correction across a library of capture stores.
//!
//! Each capture (cap) lives under `<root>/<cap_name>/processed/data.store`
//! and has a per-cap scale factor in a scaler table. Correction rewrites
//! every cap into the mirrored layout under the output root. A failure in
//! one cap is logged and the run continues; this is the only layer that
//! swallows errors.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{error, info, warn};
use serde::Deserialize;

use crate::data_structs::typedef::SignalType;
use crate::data_structs::DenseTrack;
use crate::io::store::{ChromStore, DirStore};

pub const DEFAULT_SCALE_THRESHOLD: f64 = 0.05;

/// How the scale factor is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DosageMode {
    /// Multiply every chromosome of every cap by its scale.
    Multiplier,
    /// Copy caps unchanged, but only those whose scale is within the
    /// threshold of 1.0; the rest are skipped with a warning.
    Filter,
}

/// One row of the scaler table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScalerEntry {
    pub cap_name: String,
    pub scale:    f64,
}

/// Reads a `cap_name,scale` CSV table with a header row.
pub fn read_scaler<R: Read>(reader: R) -> anyhow::Result<Vec<ScalerEntry>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut entries = Vec::new();
    for record in csv_reader.deserialize() {
        entries.push(record.context("Malformed scaler record")?);
    }
    Ok(entries)
}

/// Outcome counts of a dosage-correction run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DosageSummary {
    pub n_corrected: usize,
    pub n_skipped:   usize,
    pub n_failed:    usize,
}

fn cap_store_path(
    root: &Path,
    cap_name: &str,
) -> PathBuf {
    root.join(cap_name).join("processed").join("data.store")
}

fn rewrite_cap(
    data_root: &Path,
    output_root: &Path,
    cap_name: &str,
    scale: f64,
) -> anyhow::Result<()> {
    let input: DirStore<SignalType> = DirStore::open(cap_store_path(data_root, cap_name))?;
    let mut output: DirStore<SignalType> =
        DirStore::create(cap_store_path(output_root, cap_name), input.chunk_size())?;

    for chrom in input.chr_names() {
        let track = input.read(&chrom)?;
        let scaled = DenseTrack::new(
            track
                .values()
                .iter()
                .map(|v| (f64::from(*v) * scale) as SignalType)
                .collect(),
        );
        let attrs = input.chrom_attrs(&chrom).unwrap_or_default();
        output.write(&chrom, scaled, attrs)?;
    }
    for (key, value) in input.group_attrs() {
        output.set_group_attr(&key, value)?;
    }
    Ok(())
}

/// Applies the scaler table to every cap under `data_root`, writing results
/// under `output_root`.
pub fn correct_dosage(
    data_root: &Path,
    output_root: &Path,
    scaler: &[ScalerEntry],
    mode: DosageMode,
    threshold: f64,
) -> anyhow::Result<DosageSummary> {
    let mut summary = DosageSummary::default();
    for entry in scaler {
        let scale = match mode {
            DosageMode::Multiplier => entry.scale,
            DosageMode::Filter => {
                if (entry.scale - 1.0).abs() > threshold {
                    warn!(
                        "Skipping {}: scale {} deviates from 1.0 by more than {}",
                        entry.cap_name, entry.scale, threshold
                    );
                    summary.n_skipped += 1;
                    continue;
                }
                1.0
            },
        };
        info!("Correcting {} with scale {}", entry.cap_name, scale);
        match rewrite_cap(data_root, output_root, &entry.cap_name, scale) {
            Ok(()) => summary.n_corrected += 1,
            Err(err) => {
                error!("Error in {}: {:#}", entry.cap_name, err);
                summary.n_failed += 1;
            },
        }
    }
    info!(
        "Dosage correction done: {} corrected, {} skipped, {} failed",
        summary.n_corrected, summary.n_skipped, summary.n_failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use hashbrown::HashMap;

    use super::*;

    fn make_cap(
        root: &Path,
        cap_name: &str,
        values: Vec<SignalType>,
    ) {
        let mut store: DirStore<SignalType> =
            DirStore::create(cap_store_path(root, cap_name), 1000).unwrap();
        store
            .write("chr1", DenseTrack::new(values), HashMap::new())
            .unwrap();
        store.set_group_attr("qc_std_0.3", 0.01).unwrap();
    }

    #[test]
    fn test_read_scaler() {
        let input = "cap_name,scale\nCTCF,2.0\nH3K27ac,0.5\n";
        let entries = read_scaler(input.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].cap_name, "CTCF");
        assert_approx_eq!(entries[0].scale, 2.0);
    }

    #[test]
    fn test_multiplier_mode_scales_values() {
        let data = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        make_cap(data.path(), "CTCF", vec![1.0, 2.0, 3.0]);

        let scaler = vec![ScalerEntry {
            cap_name: "CTCF".to_string(),
            scale:    2.0,
        }];
        let summary = correct_dosage(
            data.path(),
            output.path(),
            &scaler,
            DosageMode::Multiplier,
            DEFAULT_SCALE_THRESHOLD,
        )
        .unwrap();
        assert_eq!(summary.n_corrected, 1);

        let store: DirStore<SignalType> =
            DirStore::open(cap_store_path(output.path(), "CTCF")).unwrap();
        assert_eq!(store.read("chr1").unwrap().values(), &[2.0, 4.0, 6.0]);
        // Group attributes travel with the cap.
        assert_eq!(store.group_attrs().get("qc_std_0.3"), Some(&0.01));
    }

    #[test]
    fn test_filter_mode_skips_deviant_scales() {
        let data = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        make_cap(data.path(), "CTCF", vec![1.0, 2.0]);
        make_cap(data.path(), "H3K27ac", vec![3.0, 4.0]);

        let scaler = vec![
            ScalerEntry {
                cap_name: "CTCF".to_string(),
                scale:    1.02,
            },
            ScalerEntry {
                cap_name: "H3K27ac".to_string(),
                scale:    0.5,
            },
        ];
        let summary = correct_dosage(
            data.path(),
            output.path(),
            &scaler,
            DosageMode::Filter,
            0.05,
        )
        .unwrap();
        assert_eq!(summary.n_corrected, 1);
        assert_eq!(summary.n_skipped, 1);

        // The surviving cap is copied unchanged.
        let store: DirStore<SignalType> =
            DirStore::open(cap_store_path(output.path(), "CTCF")).unwrap();
        assert_eq!(store.read("chr1").unwrap().values(), &[1.0, 2.0]);
        assert!(DirStore::<SignalType>::open(cap_store_path(output.path(), "H3K27ac"))
            .is_err());
    }

    #[test]
    fn test_missing_cap_is_logged_and_skipped() {
        let data = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        make_cap(data.path(), "CTCF", vec![1.0]);

        let scaler = vec![
            ScalerEntry {
                cap_name: "MISSING".to_string(),
                scale:    1.0,
            },
            ScalerEntry {
                cap_name: "CTCF".to_string(),
                scale:    1.0,
            },
        ];
        let summary = correct_dosage(
            data.path(),
            output.path(),
            &scaler,
            DosageMode::Multiplier,
            DEFAULT_SCALE_THRESHOLD,
        )
        .unwrap();
        assert_eq!(summary.n_failed, 1);
        assert_eq!(summary.n_corrected, 1);
    }
}
