//! Readers for tabular region lists: bed-like loci/exclusion tables and
//! gene-model (GFF) annotations.

use std::io::{BufRead, BufReader, Read};

use anyhow::{bail, Context};
use log::debug;

use crate::data_structs::typedef::{PosType, SeqName};
use crate::data_structs::Interval;

/// Reads a bed-like table `chrom start end [label]`. Order-independent and
/// the label column may be present on some lines and absent on others; a
/// record that does not parse fails the whole read.
pub fn read_bed<R: Read>(reader: R) -> anyhow::Result<Vec<Interval>> {
    let mut intervals = Vec::new();
    for (lineno, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.context("Failed to read bed line")?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let context = || format!("Malformed bed record on line {}", lineno + 1);
        let mut fields = line.split('\t');
        let chrom = fields
            .next()
            .filter(|f| !f.is_empty())
            .map(SeqName::from)
            .with_context(context)?;
        let start = fields
            .next()
            .and_then(|f| f.parse::<PosType>().ok())
            .with_context(context)?;
        let end = fields
            .next()
            .and_then(|f| f.trim_end().parse::<PosType>().ok())
            .with_context(context)?;
        if start >= end {
            bail!("Empty bed interval on line {}", lineno + 1);
        }
        let label = fields
            .next()
            .map(str::trim_end)
            .filter(|f| !f.is_empty())
            .map(SeqName::from);
        intervals.push(Interval::new(chrom, start, end).with_label(label));
    }
    Ok(intervals)
}

/// Reads gene-model regions from a GFF3 annotation.
///
/// Only the coordinate fields and the feature type are extracted. Strand is
/// present in the input but deliberately not used to flip coordinates; region
/// extraction treats every feature as laid out on the forward strand.
pub fn read_gff<R: Read>(reader: R) -> anyhow::Result<Vec<Interval>> {
    let mut gff_reader =
        bio::io::gff::Reader::new(reader, bio::io::gff::GffType::GFF3);
    let mut intervals = Vec::new();
    for record in gff_reader.records() {
        let record = record.context("Malformed gff record")?;
        if record.start() >= record.end() {
            debug!(
                "Skipping zero-length gff feature {} at {}:{}",
                record.feature_type(),
                record.seqname(),
                record.start()
            );
            continue;
        }
        intervals.push(
            Interval::new(
                SeqName::from(record.seqname()),
                *record.start(),
                *record.end(),
            )
            .with_label(Some(SeqName::from(record.feature_type()))),
        );
    }
    Ok(intervals)
}
