use anyhow::ensure;
use serde::{Deserialize, Serialize};

use crate::data_structs::typedef::{PosType, TrackValue};

/// A dense per-base array covering one chromosome.
///
/// Owned by exactly one store entry; mutated only while it is being built or
/// compressed, never shared between producers.
// The `TrackValue` supertrait already requires `DeserializeOwned`, so the
// derive must not add its own `T: Deserialize<'de>` bound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent, bound = "")]
pub struct DenseTrack<T: TrackValue> {
    values: Vec<T>,
}

impl<T: TrackValue> DenseTrack<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self { values }
    }

    /// A zero-filled track of the given length.
    pub fn zeros(length: PosType) -> Self {
        Self {
            values: vec![T::default(); length as usize],
        }
    }

    pub fn len(&self) -> PosType {
        self.values.len() as PosType
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn into_inner(self) -> Vec<T> {
        self.values
    }

    /// Bounds-checked slice of `[start, end)`.
    pub fn get(
        &self,
        start: PosType,
        end: PosType,
    ) -> anyhow::Result<&[T]> {
        ensure!(start <= end, "Invalid range {}..{}", start, end);
        ensure!(
            end <= self.len(),
            "Range {}..{} exceeds track length {}",
            start,
            end,
            self.len()
        );
        Ok(&self.values[start as usize..end as usize])
    }

    /// Grows the track to `length` by appending zeros. A no-op when the track
    /// is already long enough.
    pub fn pad_to(
        &mut self,
        length: PosType,
    ) {
        if (length as usize) > self.values.len() {
            self.values.resize(length as usize, T::default());
        }
    }

    /// Mean of `[start, end)` as `f64`.
    pub fn mean(
        &self,
        start: PosType,
        end: PosType,
    ) -> anyhow::Result<f64> {
        let slice = self.get(start, end)?;
        ensure!(!slice.is_empty(), "Cannot take mean of an empty range");
        let sum: f64 = slice
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .sum();
        Ok(sum / slice.len() as f64)
    }
}

impl<T: TrackValue> From<Vec<T>> for DenseTrack<T> {
    fn from(values: Vec<T>) -> Self {
        Self::new(values)
    }
}
