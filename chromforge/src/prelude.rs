pub use crate::data_structs::typedef::{
    CoverageType,
    PosType,
    SeqName,
    SignalType,
    TrackValue,
};
pub use crate::data_structs::{
    DenseTrack,
    Genome,
    Interval,
    Locus,
};
pub use crate::io::coverage::{
    coverage_to_store,
    fill_gaps,
    materialize_chrom,
    read_coverage,
    CoverageRecord,
};
pub use crate::io::export::{
    export_store,
    BedGraphSink,
    TrackSink,
};
pub use crate::io::loci::{
    read_bed,
    read_gff,
};
pub use crate::io::store::{
    ChromStore,
    DirStore,
    MemStore,
};
pub use crate::tools::compress::{
    background_noise,
    compress_store,
    compress_track,
    BinLadder,
    Rung,
};
pub use crate::tools::dosage::{
    correct_dosage,
    read_scaler,
    DosageMode,
    DosageSummary,
    ScalerEntry,
};
pub use crate::tools::partition::{
    BedLoci,
    GenomePartitioner,
    GffLoci,
    LociLoader,
    Partition,
    TiledLoci,
    TupleLoci,
    WindowConfig,
};
pub use crate::tools::peaks::{
    call_genome_peaks,
    call_peaks,
    read_peaks_bed,
    write_peaks_bed,
};
