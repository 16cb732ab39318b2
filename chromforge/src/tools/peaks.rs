//! Threshold peak calling on dense signal tracks.

use std::io::{BufRead, BufReader, Read, Write};

use anyhow::Context;
use log::info;

use crate::data_structs::typedef::{PosType, SeqName, SignalType};
use crate::data_structs::Interval;
use crate::io::store::ChromStore;

pub const DEFAULT_PEAK_THRESHOLD: f64 = 0.5;
pub const MIN_PEAK_WIDTH: PosType = 100;

/// Calls peaks on one dense track.
///
/// A candidate peak is a maximal run of positions strictly above the
/// threshold. Candidates are kept when their mean signal also exceeds the
/// threshold and they are at least [`MIN_PEAK_WIDTH`] wide. Returns
/// `(start, end, mean)` triples in coordinate order.
pub fn call_peaks(
    values: &[SignalType],
    threshold: f64,
) -> Vec<(PosType, PosType, f64)> {
    let mut peaks = Vec::new();
    let mut run_start: Option<usize> = None;

    let close_run = |start: usize, end: usize, peaks: &mut Vec<_>| {
        if ((end - start) as PosType) < MIN_PEAK_WIDTH {
            return;
        }
        let mean = values[start..end]
            .iter()
            .map(|v| f64::from(*v))
            .sum::<f64>()
            / (end - start) as f64;
        if mean > threshold {
            peaks.push((start as PosType, end as PosType, mean));
        }
    };

    for (idx, value) in values.iter().enumerate() {
        let above = f64::from(*value) > threshold;
        match (run_start, above) {
            (None, true) => run_start = Some(idx),
            (Some(start), false) => {
                close_run(start, idx, &mut peaks);
                run_start = None;
            },
            _ => {},
        }
    }
    if let Some(start) = run_start {
        close_run(start, values.len(), &mut peaks);
    }
    peaks
}

/// Calls peaks on every chromosome of a store, in store order.
pub fn call_genome_peaks<S: ChromStore<SignalType>>(
    store: &S,
    threshold: f64,
) -> anyhow::Result<Vec<Interval>> {
    let mut peaks = Vec::new();
    for chrom in store.chr_names() {
        info!("Calling peaks on {}", chrom);
        let track = store.read(&chrom)?;
        peaks.extend(
            call_peaks(track.values(), threshold)
                .into_iter()
                .map(|(start, end, mean)| {
                    Interval::new(chrom.clone(), start, end).with_value(Some(mean))
                }),
        );
    }
    info!("Called {} peaks", peaks.len());
    Ok(peaks)
}

/// Writes peaks as a bed-like `chrom start end value` table.
pub fn write_peaks_bed<W: Write>(
    peaks: &[Interval],
    mut sink: W,
) -> anyhow::Result<()> {
    for peak in peaks {
        writeln!(
            sink,
            "{}\t{}\t{}\t{}",
            peak.chrom(),
            peak.start(),
            peak.end(),
            peak.value().context("Peak is missing its value")?
        )?;
    }
    Ok(())
}

/// Reads peaks back from a `chrom start end value` table.
pub fn read_peaks_bed<R: Read>(reader: R) -> anyhow::Result<Vec<Interval>> {
    let mut peaks = Vec::new();
    for (lineno, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.context("Failed to read peaks line")?;
        if line.trim().is_empty() {
            continue;
        }
        let context = || format!("Malformed peak record on line {}", lineno + 1);
        let mut fields = line.split('\t');
        let chrom = fields.next().map(SeqName::from).with_context(context)?;
        let start = fields
            .next()
            .and_then(|f| f.parse::<PosType>().ok())
            .with_context(context)?;
        let end = fields
            .next()
            .and_then(|f| f.parse::<PosType>().ok())
            .with_context(context)?;
        let value = fields
            .next()
            .and_then(|f| f.parse::<f64>().ok())
            .with_context(context)?;
        peaks.push(Interval::new(chrom, start, end).with_value(Some(value)));
    }
    Ok(peaks)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use hashbrown::HashMap;

    use super::*;
    use crate::data_structs::DenseTrack;
    use crate::io::store::MemStore;

    fn track_with_peaks() -> Vec<SignalType> {
        let mut values = vec![0.0f32; 1000];
        // Wide peak, kept.
        values[100..300].fill(0.9);
        // Too narrow, dropped.
        values[500..550].fill(0.9);
        // Runs to the end of the track.
        values[850..].fill(0.8);
        values
    }

    #[test]
    fn test_call_peaks_width_filter() {
        let peaks = call_peaks(&track_with_peaks(), 0.5);
        assert_eq!(peaks.len(), 2);
        assert_eq!((peaks[0].0, peaks[0].1), (100, 300));
        assert_approx_eq!(peaks[0].2, 0.9);
        assert_eq!((peaks[1].0, peaks[1].1), (850, 1000));
        assert_approx_eq!(peaks[1].2, 0.8);
    }

    #[test]
    fn test_value_at_threshold_is_not_a_peak() {
        let values = vec![0.5f32; 200];
        assert!(call_peaks(&values, 0.5).is_empty());
    }

    #[test]
    fn test_all_background_yields_no_peaks() {
        let values = vec![0.1f32; 500];
        assert!(call_peaks(&values, 0.5).is_empty());
    }

    #[test]
    fn test_genome_peaks_carry_chromosome() {
        let mut store = MemStore::new();
        store
            .write(
                "chr1",
                DenseTrack::new(track_with_peaks()),
                HashMap::new(),
            )
            .unwrap();
        store
            .write("chr2", DenseTrack::zeros(500), HashMap::new())
            .unwrap();

        let peaks = call_genome_peaks(&store, 0.5).unwrap();
        assert_eq!(peaks.len(), 2);
        assert!(peaks.iter().all(|p| p.chrom().as_str() == "chr1"));
    }

    #[test]
    fn test_peaks_bed_roundtrip() {
        let peaks = vec![
            Interval::new("chr1".into(), 100, 300).with_value(Some(0.9)),
            Interval::new("chr2".into(), 0, 150).with_value(Some(0.75)),
        ];
        let mut buffer = Vec::new();
        write_peaks_bed(&peaks, &mut buffer).unwrap();
        let reread = read_peaks_bed(&buffer[..]).unwrap();
        assert_eq!(reread, peaks);
    }

    #[test]
    fn test_read_peaks_malformed_is_fatal() {
        assert!(read_peaks_bed("chr1\t100\tnot_a_number\t0.5\n".as_bytes()).is_err());
    }
}
