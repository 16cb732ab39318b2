//! Chromosome-keyed dense track stores.
//!
//! A [`ChromStore`] maps chromosome names to 1-D numeric arrays with a
//! byte-range-like `get(chrom, start, end)` read contract. [`MemStore`] keeps
//! everything in memory; [`DirStore`] persists one chunked, zstd-compressed
//! file per chromosome under a directory, with a JSON manifest holding
//! lengths, chunk offsets and numeric attributes. Runs of constant values
//! dominate dense tracks, which zstd squeezes well.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context};
use hashbrown::HashMap;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::data_structs::typedef::{PosType, SeqName, TrackValue};
use crate::data_structs::{DenseTrack, Genome};

pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;
const ZSTD_LEVEL: i32 = 3;
const MANIFEST_NAME: &str = "manifest.json";

/// Chromosome-keyed mapping from name to dense track.
pub trait ChromStore<T: TrackValue> {
    fn chr_names(&self) -> Vec<SeqName>;

    fn length_of(
        &self,
        chrom: &str,
    ) -> Option<PosType>;

    fn read(
        &self,
        chrom: &str,
    ) -> anyhow::Result<DenseTrack<T>>;

    /// Reads the `[start, end)` slice of one chromosome.
    fn get(
        &self,
        chrom: &str,
        start: PosType,
        end: PosType,
    ) -> anyhow::Result<Vec<T>> {
        let track = self.read(chrom)?;
        Ok(track.get(start, end)?.to_vec())
    }

    /// Stores a track under `chrom`, replacing any previous entry, together
    /// with its numeric attributes.
    fn write(
        &mut self,
        chrom: &str,
        track: DenseTrack<T>,
        attrs: HashMap<String, f64>,
    ) -> anyhow::Result<()>;

    fn chrom_attrs(
        &self,
        chrom: &str,
    ) -> Option<HashMap<String, f64>>;

    fn set_group_attr(
        &mut self,
        key: &str,
        value: f64,
    ) -> anyhow::Result<()>;

    fn group_attrs(&self) -> HashMap<String, f64>;

    /// `(name, length)` pairs in insertion order, e.g. for export headers.
    fn lengths(&self) -> Vec<(SeqName, PosType)> {
        self.chr_names()
            .into_iter()
            .filter_map(|name| {
                self.length_of(&name)
                    .map(|length| (name, length))
            })
            .collect()
    }

    /// Checks every stored length against the reference genome. A mismatch
    /// is a fatal consistency error.
    fn check_lengths(
        &self,
        genome: &Genome,
    ) -> anyhow::Result<()> {
        for (name, length) in self.lengths() {
            match genome.length_of(&name) {
                Some(expected) if expected == length => {},
                Some(expected) => {
                    bail!(
                        "Chromosome length for {} is not consistent: ref {} vs data {}",
                        name,
                        expected,
                        length
                    )
                },
                None => bail!("Chromosome {} is not part of the genome", name),
            }
        }
        Ok(())
    }
}

/// In-memory store, mostly for tests and intermediate pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct MemStore<T: TrackValue> {
    chroms: IndexMap<SeqName, (DenseTrack<T>, HashMap<String, f64>)>,
    attrs:  HashMap<String, f64>,
}

impl<T: TrackValue> MemStore<T> {
    pub fn new() -> Self {
        Self {
            chroms: IndexMap::new(),
            attrs:  HashMap::new(),
        }
    }
}

impl<T: TrackValue> ChromStore<T> for MemStore<T> {
    fn chr_names(&self) -> Vec<SeqName> {
        self.chroms.keys().cloned().collect()
    }

    fn length_of(
        &self,
        chrom: &str,
    ) -> Option<PosType> {
        self.chroms
            .get(chrom)
            .map(|(track, _)| track.len())
    }

    fn read(
        &self,
        chrom: &str,
    ) -> anyhow::Result<DenseTrack<T>> {
        self.chroms
            .get(chrom)
            .map(|(track, _)| track.clone())
            .with_context(|| format!("No track stored for {}", chrom))
    }

    fn write(
        &mut self,
        chrom: &str,
        track: DenseTrack<T>,
        attrs: HashMap<String, f64>,
    ) -> anyhow::Result<()> {
        self.chroms
            .insert(SeqName::from(chrom), (track, attrs));
        Ok(())
    }

    fn chrom_attrs(
        &self,
        chrom: &str,
    ) -> Option<HashMap<String, f64>> {
        self.chroms
            .get(chrom)
            .map(|(_, attrs)| attrs.clone())
    }

    fn set_group_attr(
        &mut self,
        key: &str,
        value: f64,
    ) -> anyhow::Result<()> {
        self.attrs.insert(key.to_string(), value);
        Ok(())
    }

    fn group_attrs(&self) -> HashMap<String, f64> {
        self.attrs.clone()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChromMeta {
    length:      PosType,
    chunk_bytes: Vec<u64>,
    attrs:       HashMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    chunk_size: usize,
    attrs:      HashMap<String, f64>,
    chroms:     IndexMap<String, ChromMeta>,
}

/// Directory-backed store: `manifest.json` plus one `<chrom>.track` file per
/// chromosome, each a concatenation of independently compressed chunks so
/// range reads only touch the chunks they need.
#[derive(Debug)]
pub struct DirStore<T: TrackValue> {
    root:     PathBuf,
    manifest: Manifest,
    _marker:  PhantomData<T>,
}

impl<T: TrackValue> DirStore<T> {
    /// Creates a new store directory (and an empty manifest) at `root`.
    pub fn create<P: AsRef<Path>>(
        root: P,
        chunk_size: usize,
    ) -> anyhow::Result<Self> {
        ensure!(chunk_size > 0, "Chunk size must be positive");
        std::fs::create_dir_all(root.as_ref()).with_context(|| {
            format!("Failed to create store directory {}", root.as_ref().display())
        })?;
        let store = Self {
            root:     root.as_ref().to_path_buf(),
            manifest: Manifest {
                chunk_size,
                attrs: HashMap::new(),
                chroms: IndexMap::new(),
            },
            _marker:  PhantomData,
        };
        store.save_manifest()?;
        Ok(store)
    }

    /// Opens an existing store directory.
    pub fn open<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let manifest_path = root.as_ref().join(MANIFEST_NAME);
        let manifest_file = File::open(&manifest_path).with_context(|| {
            format!("Failed to open store manifest {}", manifest_path.display())
        })?;
        let manifest: Manifest = serde_json::from_reader(manifest_file)
            .context("Failed to parse store manifest")?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            manifest,
            _marker: PhantomData,
        })
    }

    /// Opens a store and validates every stored chromosome length against
    /// the reference genome.
    pub fn open_checked<P: AsRef<Path>>(
        root: P,
        genome: &Genome,
    ) -> anyhow::Result<Self> {
        let store = Self::open(root)?;
        store.check_lengths(genome)?;
        Ok(store)
    }

    pub fn chunk_size(&self) -> usize {
        self.manifest.chunk_size
    }

    crate::getter_fn!(root, PathBuf);

    fn track_path(
        &self,
        chrom: &str,
    ) -> PathBuf {
        self.root.join(format!("{chrom}.track"))
    }

    fn save_manifest(&self) -> anyhow::Result<()> {
        let file = File::create(self.root.join(MANIFEST_NAME))
            .context("Failed to write store manifest")?;
        serde_json::to_writer_pretty(file, &self.manifest)?;
        Ok(())
    }

    fn meta(
        &self,
        chrom: &str,
    ) -> anyhow::Result<&ChromMeta> {
        self.manifest
            .chroms
            .get(chrom)
            .with_context(|| format!("No track stored for {}", chrom))
    }

    fn decode_chunk(bytes: &[u8]) -> anyhow::Result<Vec<T>> {
        let raw = zstd::decode_all(bytes).context("Failed to decompress chunk")?;
        bincode::deserialize(&raw).context("Failed to decode chunk")
    }

    /// Decodes chunks `[first, last)` of a chromosome file.
    fn read_chunks(
        &self,
        chrom: &str,
        first: usize,
        last: usize,
    ) -> anyhow::Result<Vec<T>> {
        let meta = self.meta(chrom)?;
        ensure!(last <= meta.chunk_bytes.len(), "Chunk range out of bounds");
        let offset: u64 = meta.chunk_bytes[..first].iter().sum();

        let mut file = File::open(self.track_path(chrom))
            .with_context(|| format!("Failed to open track file for {}", chrom))?;
        file.seek(SeekFrom::Start(offset))?;

        let mut values = Vec::new();
        for &len in &meta.chunk_bytes[first..last] {
            let mut buffer = vec![0u8; len as usize];
            file.read_exact(&mut buffer)?;
            values.extend(Self::decode_chunk(&buffer)?);
        }
        Ok(values)
    }
}

impl<T: TrackValue> ChromStore<T> for DirStore<T> {
    fn chr_names(&self) -> Vec<SeqName> {
        self.manifest
            .chroms
            .keys()
            .map(|name| SeqName::from(name.as_str()))
            .collect()
    }

    fn length_of(
        &self,
        chrom: &str,
    ) -> Option<PosType> {
        self.manifest
            .chroms
            .get(chrom)
            .map(|meta| meta.length)
    }

    fn read(
        &self,
        chrom: &str,
    ) -> anyhow::Result<DenseTrack<T>> {
        let n_chunks = self.meta(chrom)?.chunk_bytes.len();
        Ok(DenseTrack::new(self.read_chunks(chrom, 0, n_chunks)?))
    }

    fn get(
        &self,
        chrom: &str,
        start: PosType,
        end: PosType,
    ) -> anyhow::Result<Vec<T>> {
        let meta = self.meta(chrom)?;
        ensure!(start <= end, "Invalid range {}..{}", start, end);
        ensure!(
            end <= meta.length,
            "Range {}..{} exceeds length {} of {}",
            start,
            end,
            meta.length,
            chrom
        );
        let chunk_size = self.manifest.chunk_size as PosType;
        let first = (start / chunk_size) as usize;
        let last = (end.div_ceil(chunk_size) as usize).max(first);

        let values = self.read_chunks(chrom, first, last)?;
        let local_start = (start - first as PosType * chunk_size) as usize;
        let local_end = (end - first as PosType * chunk_size) as usize;
        Ok(values[local_start..local_end].to_vec())
    }

    fn write(
        &mut self,
        chrom: &str,
        track: DenseTrack<T>,
        attrs: HashMap<String, f64>,
    ) -> anyhow::Result<()> {
        let mut file = File::create(self.track_path(chrom))
            .with_context(|| format!("Failed to create track file for {}", chrom))?;

        let mut chunk_bytes = Vec::new();
        for chunk in track.values().chunks(self.manifest.chunk_size) {
            let raw = bincode::serialize(chunk)?;
            let compressed = zstd::encode_all(&raw[..], ZSTD_LEVEL)?;
            chunk_bytes.push(compressed.len() as u64);
            file.write_all(&compressed)?;
        }
        file.flush()?;

        debug!(
            "Stored {} ({} bp, {} chunks)",
            chrom,
            track.len(),
            chunk_bytes.len()
        );
        self.manifest.chroms.insert(
            chrom.to_string(),
            ChromMeta {
                length: track.len(),
                chunk_bytes,
                attrs,
            },
        );
        self.save_manifest()
    }

    fn chrom_attrs(
        &self,
        chrom: &str,
    ) -> Option<HashMap<String, f64>> {
        self.manifest
            .chroms
            .get(chrom)
            .map(|meta| meta.attrs.clone())
    }

    fn set_group_attr(
        &mut self,
        key: &str,
        value: f64,
    ) -> anyhow::Result<()> {
        self.manifest
            .attrs
            .insert(key.to_string(), value);
        self.save_manifest()
    }

    fn group_attrs(&self) -> HashMap<String, f64> {
        self.manifest.attrs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structs::typedef::SignalType;

    fn sample_track() -> DenseTrack<SignalType> {
        let mut values = vec![0.0f32; 2500];
        values[100..200].fill(1.5);
        values[2400..].fill(0.25);
        DenseTrack::new(values)
    }

    #[test]
    fn test_dir_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: DirStore<SignalType> = DirStore::create(dir.path(), 1000).unwrap();
        let mut attrs = HashMap::new();
        attrs.insert("qc_std_0.3".to_string(), 0.01);
        store
            .write("chr1", sample_track(), attrs)
            .unwrap();

        let reopened: DirStore<SignalType> = DirStore::open(dir.path()).unwrap();
        assert_eq!(reopened.length_of("chr1"), Some(2500));
        assert_eq!(reopened.read("chr1").unwrap(), sample_track());
        assert_eq!(
            reopened
                .chrom_attrs("chr1")
                .unwrap()
                .get("qc_std_0.3"),
            Some(&0.01)
        );
    }

    #[test]
    fn test_dir_store_ranged_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: DirStore<SignalType> = DirStore::create(dir.path(), 1000).unwrap();
        store
            .write("chr1", sample_track(), HashMap::new())
            .unwrap();

        // Within one chunk.
        assert_eq!(store.get("chr1", 100, 102).unwrap(), vec![1.5, 1.5]);
        // Across a chunk boundary.
        let spanning = store.get("chr1", 950, 1050).unwrap();
        assert_eq!(spanning.len(), 100);
        assert!(spanning.iter().all(|&v| v == 0.0));
        // Tail chunk.
        assert_eq!(store.get("chr1", 2400, 2401).unwrap(), vec![0.25]);
    }

    #[test]
    fn test_dir_store_get_out_of_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: DirStore<SignalType> = DirStore::create(dir.path(), 1000).unwrap();
        store
            .write("chr1", sample_track(), HashMap::new())
            .unwrap();
        assert!(store.get("chr1", 2400, 2501).is_err());
    }

    #[test]
    fn test_dir_store_group_attrs_persist() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: DirStore<SignalType> = DirStore::create(dir.path(), 1000).unwrap();
        store.set_group_attr("qc_std_0.3", 0.5).unwrap();

        let reopened: DirStore<SignalType> = DirStore::open(dir.path()).unwrap();
        assert_eq!(reopened.group_attrs().get("qc_std_0.3"), Some(&0.5));
    }

    #[test]
    fn test_check_lengths_mismatch_is_fatal() {
        let mut store: MemStore<SignalType> = MemStore::new();
        store
            .write("chr1", DenseTrack::zeros(100), HashMap::new())
            .unwrap();

        let good = Genome::from_pairs([("chr1", 100u64)]);
        let bad = Genome::from_pairs([("chr1", 99u64)]);
        assert!(store.check_lengths(&good).is_ok());
        assert!(store.check_lengths(&bad).is_err());
    }
}
