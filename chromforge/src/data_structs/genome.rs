use std::io::{BufRead, BufReader, Read};

use anyhow::{bail, Context};
use indexmap::IndexMap;

use crate::data_structs::interval::Interval;
use crate::data_structs::typedef::{PosType, SeqName};

/// Reference chromosome lengths for one assembly.
///
/// Immutable after construction. Every interval the partitioner hands out is
/// checked against these lengths; a mismatch is a fatal consistency error,
/// never something to clamp.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    assembly:    Option<String>,
    chr_lengths: IndexMap<SeqName, PosType>,
}

impl Genome {
    pub fn new(
        assembly: Option<String>,
        chr_lengths: IndexMap<SeqName, PosType>,
    ) -> Self {
        Self {
            assembly,
            chr_lengths,
        }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, PosType)>,
        S: Into<SeqName>, {
        Self {
            assembly:    None,
            chr_lengths: pairs
                .into_iter()
                .map(|(name, length)| (name.into(), length))
                .collect(),
        }
    }

    /// Reads a `name<TAB>length` table (e.g. a `.chrom.sizes` file).
    pub fn from_chrom_sizes<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut chr_lengths = IndexMap::new();
        for (lineno, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.context("Failed to read chromosome sizes line")?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let name = match fields.next() {
                Some(name) if !name.is_empty() => SeqName::from(name),
                _ => bail!("Missing chromosome name on line {}", lineno + 1),
            };
            let length = fields
                .next()
                .with_context(|| format!("Missing length for {}", name))?
                .trim()
                .parse::<PosType>()
                .with_context(|| format!("Invalid length for {}", name))?;
            chr_lengths.insert(name, length);
        }
        Ok(Self {
            assembly: None,
            chr_lengths,
        })
    }

    pub fn with_assembly(
        mut self,
        assembly: String,
    ) -> Self {
        self.assembly = Some(assembly);
        self
    }

    pub fn assembly(&self) -> Option<&str> {
        self.assembly.as_deref()
    }

    pub fn contains(
        &self,
        chrom: &str,
    ) -> bool {
        self.chr_lengths.contains_key(chrom)
    }

    pub fn length_of(
        &self,
        chrom: &str,
    ) -> Option<PosType> {
        self.chr_lengths.get(chrom).copied()
    }

    pub fn chr_names(&self) -> impl Iterator<Item = &SeqName> {
        self.chr_lengths.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SeqName, PosType)> {
        self.chr_lengths
            .iter()
            .map(|(name, length)| (name, *length))
    }

    pub fn n_chr(&self) -> usize {
        self.chr_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chr_lengths.is_empty()
    }

    /// Asserts that an interval lies within its chromosome.
    pub fn check_interval(
        &self,
        interval: &Interval,
    ) -> anyhow::Result<()> {
        let Some(chr_length) = self.length_of(interval.chrom()) else {
            bail!("Chromosome {} is not part of the genome", interval.chrom());
        };
        if interval.start() >= interval.end() || interval.end() > chr_length {
            bail!(
                "Interval {} is not consistent with chromosome length {}",
                interval,
                chr_length
            );
        }
        Ok(())
    }
}
