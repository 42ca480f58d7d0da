//! Derive the slice index and slice spacing of a stack of 2D images.
//!
//! Documents either number their slices directly with `position z`, or, in the
//! case of legacy 3D exports, only give each spectrum a physical z position from
//! which slices have to be reconstructed.
use log::{debug, warn};

use crate::meta::{keys, micrometer_to_millimeter};
use crate::params::PropertyStore;
use crate::spectrum::SpectrumRecord;

/// Slice spacing assumed when slices are only numbered, in micrometers
pub const DEFAULT_SLICE_THICKNESS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZAxisMode {
    /// Slices are ranked from the physical z positions
    World,
    /// Slices come from the `position z` indices
    Index,
}

/// What [`resolve_z_axis`] found
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZAxisSummary {
    pub mode: ZAxisMode,
    pub slices: usize,
    /// The spacing between slices in millimeters, when there is more than one
    pub spacing: Option<f64>,
}

/// The most common step between consecutive values of a sorted, deduplicated
/// sequence. Ties go to the smallest step.
pub fn most_frequent_difference(values: &[f64]) -> Option<f64> {
    let mut steps: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    steps.sort_by(f64::total_cmp);

    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < steps.len() {
        let step = steps[i];
        let run = steps[i..]
            .iter()
            .take_while(|s| s.total_cmp(&step).is_eq())
            .count();
        match best {
            Some((_, count)) if count >= run => {}
            _ => best = Some((step, run)),
        }
        i += run;
    }
    best.map(|(step, _)| step)
}

fn distinct_world_z(records: &[SpectrumRecord]) -> Vec<f64> {
    let mut values: Vec<f64> = records.iter().map(|r| r.world[2]).collect();
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| a.total_cmp(b).is_eq());
    values
}

fn resolve_world<P: PropertyStore>(records: &mut [SpectrumRecord], store: &mut P) -> ZAxisSummary {
    let values = distinct_world_z(records);
    for record in records.iter_mut() {
        let z = record.world[2];
        let rank = values
            .binary_search_by(|v| v.total_cmp(&z))
            .unwrap_or_default();
        record.index[2] = rank as u32;
    }

    let spacing = most_frequent_difference(&values).map(micrometer_to_millimeter);
    if let Some(spacing) = spacing {
        store.set_property(keys::MAX_COUNT_OF_PIXEL_Z, values.len());
        store.set_property(keys::PIXEL_SIZE_Z, spacing);
    }
    ZAxisSummary {
        mode: ZAxisMode::World,
        slices: values.len().max(1),
        spacing,
    }
}

fn resolve_index<P: PropertyStore>(records: &mut [SpectrumRecord], store: &mut P) -> ZAxisSummary {
    let mut values: Vec<u32> = records.iter().map(|r| r.index[2]).collect();
    values.sort_unstable();
    values.dedup();

    if let Some(last) = values.last() {
        if *last as usize + 1 != values.len() {
            warn!(
                "The z indices are not contiguous, {} slices span indices 0 to {last}; renumbering them",
                values.len()
            );
        }
    }
    for record in records.iter_mut() {
        let z = record.index[2];
        record.index[2] = values.binary_search(&z).unwrap_or_default() as u32;
    }

    let spacing = if values.len() > 1 {
        let spacing = micrometer_to_millimeter(DEFAULT_SLICE_THICKNESS);
        store.set_property(keys::MAX_COUNT_OF_PIXEL_Z, values.len());
        store.set_property(keys::PIXEL_SIZE_Z, spacing);
        Some(spacing)
    } else {
        None
    };
    ZAxisSummary {
        mode: ZAxisMode::Index,
        slices: values.len().max(1),
        spacing,
    }
}

/// Assign every record a dense zero-based slice index and record the number of
/// slices and their spacing in `store`.
///
/// When `world_z` is set the slices are ranked by physical z position, otherwise
/// the indices already on the records are renumbered. A single slice leaves
/// `store` untouched.
pub fn resolve_z_axis<P: PropertyStore>(
    records: &mut [SpectrumRecord],
    world_z: bool,
    store: &mut P,
) -> ZAxisSummary {
    let summary = if world_z {
        resolve_world(records, store)
    } else {
        resolve_index(records, store)
    };
    debug!("Resolved z axis: {summary:?}");
    summary
}
