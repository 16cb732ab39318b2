use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::data_structs::typedef::{PosType, SeqName};
use crate::with_field_fn;

/// A half-open genomic interval `[start, end)` on a single chromosome.
///
/// Optionally carries a free-form label (exclusion lists, peak names) and a
/// numeric value (coverage, scores). Labels and values never take part in
/// ordering or equality of the coordinates themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interval {
    chrom: SeqName,
    start: PosType,
    end:   PosType,
    label: Option<SeqName>,
    value: Option<f64>,
}

impl Interval {
    /// Creates a new `Interval`.
    pub fn new(
        chrom: SeqName,
        start: PosType,
        end: PosType,
    ) -> Self {
        assert!(
            start < end,
            "Interval start must be strictly less than end"
        );
        Self {
            chrom,
            start,
            end,
            label: None,
            value: None,
        }
    }

    with_field_fn!(label, Option<SeqName>);

    with_field_fn!(value, Option<f64>);

    pub fn chrom(&self) -> &SeqName {
        &self.chrom
    }

    pub fn start(&self) -> PosType {
        self.start
    }

    pub fn end(&self) -> PosType {
        self.end
    }

    pub fn label(&self) -> Option<&SeqName> {
        self.label.as_ref()
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn length(&self) -> PosType {
        self.end - self.start
    }

    /// Returns a copy widened by `margin` on both sides, saturating at zero.
    /// The right side is unbounded here; chromosome clamping is the caller's
    /// concern since it needs the chromosome length.
    pub fn widened(
        &self,
        margin: PosType,
    ) -> Self {
        let mut widened = self.clone();
        widened.start = self.start.saturating_sub(margin);
        widened.end = self.end.saturating_add(margin);
        widened
    }

    /// Checks whether two intervals on the same chromosome overlap.
    pub fn intersects(
        &self,
        other: &Self,
    ) -> bool {
        self.chrom == other.chrom && self.start < other.end && other.start < self.end
    }

    /// Checks if this interval is fully contained within another.
    pub fn is_in(
        &self,
        other: &Self,
    ) -> bool {
        self.chrom == other.chrom && self.start >= other.start && self.end <= other.end
    }
}

impl From<bio::io::bed::Record> for Interval {
    fn from(value: bio::io::bed::Record) -> Self {
        Interval::new(
            SeqName::from(value.chrom()),
            value.start(),
            value.end(),
        )
        .with_label(value.name().map(SeqName::from))
    }
}

impl From<Interval> for bio::io::bed::Record {
    fn from(value: Interval) -> Self {
        let mut record = bio::io::bed::Record::new();
        record.set_chrom(value.chrom.as_str());
        record.set_start(value.start);
        record.set_end(value.end);
        if let Some(label) = value.label {
            record.set_name(label.as_str());
        }
        record
    }
}

impl PartialOrd for Interval {
    /// Compares two intervals by genomic position.
    ///
    /// Returns `None` when the chromosomes differ or the regions intersect.
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<std::cmp::Ordering> {
        if self.chrom != other.chrom {
            return None;
        }
        if self.start >= other.end {
            return Some(std::cmp::Ordering::Greater);
        }
        if self.end <= other.start {
            return Some(std::cmp::Ordering::Less);
        }
        None
    }
}

impl Display for Interval {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

/// An interval produced by a partitioning run, tagged with the region id
/// that uniquely identifies it within that run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Locus {
    interval:  Interval,
    region_id: String,
}

impl Locus {
    pub fn new(
        interval: Interval,
        region_id: String,
    ) -> Self {
        Self {
            interval,
            region_id,
        }
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    pub fn chrom(&self) -> &SeqName {
        self.interval.chrom()
    }

    pub fn start(&self) -> PosType {
        self.interval.start()
    }

    pub fn end(&self) -> PosType {
        self.interval.end()
    }
}

impl Display for Locus {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{} [{}]", self.interval, self.region_id)
    }
}
