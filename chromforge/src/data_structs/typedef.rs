use arcstr::ArcStr;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Interned chromosome name. Cloning is a refcount bump.
pub type SeqName = ArcStr;
/// Base-pair position on a chromosome.
pub type PosType = u64;
/// Element type of raw coverage tracks. 16 bits cover the read depths seen
/// in practice; overflow wraps silently, so widen this if deeper coverage is
/// expected.
pub type CoverageType = i16;
/// Element type of normalized signal tracks.
pub type SignalType = f32;

/// Value types a dense track can hold.
pub trait TrackValue:
    Copy
    + Default
    + PartialEq
    + PartialOrd
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
    + num::ToPrimitive
    + 'static {
}

impl<T> TrackValue for T where T: Copy
        + Default
        + PartialEq
        + PartialOrd
        + Send
        + Sync
        + Serialize
        + DeserializeOwned
        + num::ToPrimitive
        + 'static
{
}
