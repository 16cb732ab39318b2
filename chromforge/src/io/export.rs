//! Dense track export.
//!
//! Browser-track sinks all share the same shape: a header of
//! `(chromosome, length)` pairs followed by a run-length-encoded
//! `(start, end, value)` stream per chromosome, derived by diffing the dense
//! array at change points. [`TrackSink`] captures that contract; the binary
//! browser format itself lives behind an external adapter, while
//! [`BedGraphSink`] writes the equivalent text form.

use std::io::Write;

use anyhow::{ensure, Context};
use log::info;

use crate::data_structs::typedef::{PosType, SeqName, TrackValue};
use crate::io::store::ChromStore;
use crate::utils::ranges::dense_to_runs;

/// A sink for run-length-encoded tracks.
pub trait TrackSink<T: TrackValue> {
    /// Writes the `(name, length)` header. Must be called exactly once,
    /// before any runs.
    fn write_header(
        &mut self,
        lengths: &[(SeqName, PosType)],
    ) -> anyhow::Result<()>;

    fn write_runs(
        &mut self,
        chrom: &str,
        runs: &[(PosType, PosType, T)],
    ) -> anyhow::Result<()>;

    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Text sink: a commented chrom-sizes header block followed by bedGraph
/// `chrom start end value` lines.
pub struct BedGraphSink<W: Write> {
    sink:        W,
    header_done: bool,
}

impl<W: Write> BedGraphSink<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            header_done: false,
        }
    }
}

impl<W: Write, T: TrackValue> TrackSink<T> for BedGraphSink<W> {
    fn write_header(
        &mut self,
        lengths: &[(SeqName, PosType)],
    ) -> anyhow::Result<()> {
        ensure!(!self.header_done, "Header already written");
        for (name, length) in lengths {
            writeln!(self.sink, "#chrom\t{}\t{}", name, length)?;
        }
        self.header_done = true;
        Ok(())
    }

    fn write_runs(
        &mut self,
        chrom: &str,
        runs: &[(PosType, PosType, T)],
    ) -> anyhow::Result<()> {
        ensure!(self.header_done, "Header must be written before runs");
        for (start, end, value) in runs {
            writeln!(
                self.sink,
                "{}\t{}\t{}\t{}",
                chrom,
                start,
                end,
                value.to_f64().context("Non-numeric track value")?
            )?;
        }
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}

/// Exports every chromosome of a store through a sink, diffing each dense
/// array into runs.
pub fn export_store<T, S, K>(
    store: &S,
    sink: &mut K,
) -> anyhow::Result<()>
where
    T: TrackValue,
    S: ChromStore<T>,
    K: TrackSink<T>, {
    sink.write_header(&store.lengths())?;
    for chrom in store.chr_names() {
        info!("Exporting {}", chrom);
        let track = store.read(&chrom)?;
        let runs = dense_to_runs(track.values());
        sink.write_runs(&chrom, &runs)?;
    }
    sink.finish()
}

#[cfg(test)]
mod tests {
    use hashbrown::HashMap;

    use super::*;
    use crate::data_structs::DenseTrack;
    use crate::io::store::MemStore;

    #[test]
    fn test_export_store_bedgraph() {
        let mut store = MemStore::new();
        store
            .write(
                "chr1",
                DenseTrack::new(vec![0.0f32, 0.0, 2.0, 2.0, 1.0]),
                HashMap::new(),
            )
            .unwrap();

        let mut out = Vec::new();
        let mut sink = BedGraphSink::new(&mut out);
        export_store(&store, &mut sink).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "#chrom\tchr1\t5\nchr1\t0\t2\t0\nchr1\t2\t4\t2\nchr1\t4\t5\t1\n"
        );
    }

    #[test]
    fn test_runs_before_header_fails() {
        let mut sink = BedGraphSink::new(Vec::new());
        let runs: Vec<(PosType, PosType, f32)> = vec![(0, 1, 1.0)];
        assert!(sink.write_runs("chr1", &runs).is_err());
    }
}
