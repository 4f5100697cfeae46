//! Typed configuration overlay.
//!
//! Overlaying one configuration onto another follows three rules: slice
//! fields concatenate, map fields union with the overlay winning on key
//! conflicts, and scalar fields are overwritten unless the overlay holds the
//! zero value (`None`, an empty string, `false`, a default variant). The
//! impls are written per struct, so a shape mismatch is a compile error
//! rather than a runtime check.

use std::collections::BTreeMap;

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Merges an overlay into a base configuration, consuming the overlay.
pub trait Merge {
    /// Merges `overlay` into `self`.
    fn merge(&mut self, overlay: Self);
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Overwrites `base` unless the overlay string is empty.
pub(crate) fn overlay_string(base: &mut String, overlay: String) {
    if !overlay.is_empty() {
        *base = overlay;
    }
}

/// Overwrites `base` unless the overlay is `None`.
pub(crate) fn overlay_option<T>(base: &mut Option<T>, overlay: Option<T>) {
    if overlay.is_some() {
        *base = overlay;
    }
}

/// Unions `overlay` into `base`, overlay winning on key conflicts.
pub(crate) fn union_map<K: Ord, V>(base: &mut BTreeMap<K, V>, overlay: BTreeMap<K, V>) {
    for (key, value) in overlay {
        base.insert(key, value);
    }
}
