//! Queries and in-place edits on a [`TpsDocument`].
//!
//! These functions never commit anything. The undoable wrappers in
//! [`crate::actions`] call them on the scratch document and then commit.
//! Edits that refer to an element that doesn't exist are no-ops and
//! report `false`.

use nalgebra::{Point3, Vector3};
use tps_warp::{LandmarkPair3D, NamedLandmarkPair3D, TpsCoefficientSolverInputs3D};
use tracing::trace;

use crate::document::{
    TpsDocument, TpsDocumentElementId, TpsDocumentInputIdentifier, TpsDocumentLandmarkPair,
    TpsDocumentNonParticipatingLandmark,
};

const LANDMARK_ID_PREFIX: &str = "landmark_";
const NON_PARTICIPATING_ID_PREFIX: &str = "datapoint_";

// =============================================================================
// Lookup
// =============================================================================

pub fn find_landmark_pair<'a>(doc: &'a TpsDocument, id: &str) -> Option<&'a TpsDocumentLandmarkPair> {
    doc.landmark_pairs.iter().find(|p| p.id == id)
}

pub fn find_landmark_pair_mut<'a>(doc: &'a mut TpsDocument, id: &str) -> Option<&'a mut TpsDocumentLandmarkPair> {
    doc.landmark_pairs.iter_mut().find(|p| p.id == id)
}

pub fn find_non_participating_landmark<'a>(
    doc: &'a TpsDocument,
    id: &str,
) -> Option<&'a TpsDocumentNonParticipatingLandmark> {
    doc.non_participating_landmarks.iter().find(|l| l.id == id)
}

pub fn find_non_participating_landmark_mut<'a>(
    doc: &'a mut TpsDocument,
    id: &str,
) -> Option<&'a mut TpsDocumentNonParticipatingLandmark> {
    doc.non_participating_landmarks.iter_mut().find(|l| l.id == id)
}

/// Whether any landmark pair or non-participating landmark uses `id`.
pub fn contains_element_with_id(doc: &TpsDocument, id: &str) -> bool {
    find_landmark_pair(doc, id).is_some() || find_non_participating_landmark(doc, id).is_some()
}

/// Where an element currently is, if it exists and is placed.
pub fn element_location(doc: &TpsDocument, element: &TpsDocumentElementId) -> Option<Point3<f64>> {
    match element {
        TpsDocumentElementId::Landmark { id, input } => find_landmark_pair(doc, id)?.location(*input),
        TpsDocumentElementId::NonParticipatingLandmark { id } => {
            find_non_participating_landmark(doc, id).map(|l| l.location)
        }
    }
}

/// Every placed element in the document: landmark sides first, in pair
/// order, then non-participating landmarks.
pub fn all_element_ids(doc: &TpsDocument) -> Vec<TpsDocumentElementId> {
    let mut ids = Vec::with_capacity(2 * doc.landmark_pairs.len() + doc.non_participating_landmarks.len());
    for pair in &doc.landmark_pairs {
        for input in TpsDocumentInputIdentifier::ALL {
            if pair.has_location(input) {
                ids.push(TpsDocumentElementId::landmark(pair.id.clone(), input));
            }
        }
    }
    ids.extend(
        doc.non_participating_landmarks
            .iter()
            .map(|l| TpsDocumentElementId::non_participating_landmark(l.id.clone())),
    );
    ids
}

// =============================================================================
// Derived views
// =============================================================================

/// Fully paired landmarks, in document order.
pub fn get_landmark_pairs(doc: &TpsDocument) -> Vec<LandmarkPair3D> {
    doc.landmark_pairs.iter().filter_map(TpsDocumentLandmarkPair::as_pair).collect()
}

/// Fully paired landmarks with their ids, in document order.
pub fn get_named_landmark_pairs(doc: &TpsDocument) -> Vec<NamedLandmarkPair3D> {
    doc.landmark_pairs
        .iter()
        .filter_map(|p| Some(NamedLandmarkPair3D::new(p.id.clone(), p.as_pair()?)))
        .collect()
}

pub fn count_landmarks_for_input(doc: &TpsDocument, which: TpsDocumentInputIdentifier) -> usize {
    doc.landmark_pairs.iter().filter(|p| p.has_location(which)).count()
}

pub fn count_fully_paired_landmarks(doc: &TpsDocument) -> usize {
    doc.landmark_pairs.iter().filter(|p| p.is_fully_paired()).count()
}

/// Locations of the non-participating landmarks, in document order.
pub fn non_participating_locations(doc: &TpsDocument) -> Vec<Point3<f64>> {
    doc.non_participating_landmarks.iter().map(|l| l.location).collect()
}

/// Everything the solver needs from the document.
pub fn solver_inputs(doc: &TpsDocument) -> TpsCoefficientSolverInputs3D {
    TpsCoefficientSolverInputs3D::new(get_landmark_pairs(doc), doc.blending_factor)
        .with_options(doc.warp_options)
}

// =============================================================================
// Id generation
// =============================================================================

/// Take the next free `landmark_<n>` id, advancing the counter.
///
/// Ids already used by any element (for example, imported by name) are skipped.
pub fn next_landmark_id(doc: &mut TpsDocument) -> String {
    loop {
        let candidate = format!("{}{}", LANDMARK_ID_PREFIX, doc.next_landmark_id);
        doc.next_landmark_id += 1;
        if !contains_element_with_id(doc, &candidate) {
            return candidate;
        }
    }
}

/// Take the next free `datapoint_<n>` id, advancing the counter.
pub fn next_non_participating_landmark_id(doc: &mut TpsDocument) -> String {
    loop {
        let candidate = format!("{}{}", NON_PARTICIPATING_ID_PREFIX, doc.next_non_participating_landmark_id);
        doc.next_non_participating_landmark_id += 1;
        if !contains_element_with_id(doc, &candidate) {
            return candidate;
        }
    }
}

// =============================================================================
// Edits
// =============================================================================

/// Place a landmark on one input and return the id of the pair it landed in.
///
/// Without a name, the first pair (in insertion order) that is missing this
/// side gets it; otherwise a new half-pair is appended. With a name, the
/// pair with that id has this side overwritten, or a new pair with that id
/// is appended.
pub fn add_landmark_to_input(
    doc: &mut TpsDocument,
    which: TpsDocumentInputIdentifier,
    position: Point3<f64>,
    suggested_name: Option<&str>,
) -> String {
    if let Some(name) = suggested_name {
        if let Some(pair) = find_landmark_pair_mut(doc, name) {
            *pair.location_mut(which) = Some(position);
            return pair.id.clone();
        }
        let mut pair = TpsDocumentLandmarkPair::new(name);
        *pair.location_mut(which) = Some(position);
        doc.landmark_pairs.push(pair);
        return name.to_string();
    }

    if let Some(pair) = doc.landmark_pairs.iter_mut().find(|p| !p.has_location(which)) {
        *pair.location_mut(which) = Some(position);
        trace!(target: "tps_document::edit", id = %pair.id, %which, "paired landmark");
        return pair.id.clone();
    }

    let id = next_landmark_id(doc);
    let mut pair = TpsDocumentLandmarkPair::new(id.clone());
    *pair.location_mut(which) = Some(position);
    doc.landmark_pairs.push(pair);
    trace!(target: "tps_document::edit", %id, %which, "added half-pair");
    id
}

/// Place a non-participating landmark and return its id.
///
/// A name that is already in use overwrites that landmark's location.
pub fn add_non_participating_landmark(
    doc: &mut TpsDocument,
    location: Point3<f64>,
    suggested_name: Option<&str>,
) -> String {
    if let Some(name) = suggested_name {
        if let Some(existing) = find_non_participating_landmark_mut(doc, name) {
            existing.location = location;
        } else {
            doc.non_participating_landmarks
                .push(TpsDocumentNonParticipatingLandmark::new(name, location));
        }
        return name.to_string();
    }

    let id = next_non_participating_landmark_id(doc);
    doc.non_participating_landmarks
        .push(TpsDocumentNonParticipatingLandmark::new(id.clone(), location));
    id
}

/// Move an element to `position`.
///
/// For a landmark this places the side even if it was empty, as long as
/// the pair exists.
pub fn set_element_location(doc: &mut TpsDocument, element: &TpsDocumentElementId, position: Point3<f64>) -> bool {
    match element {
        TpsDocumentElementId::Landmark { id, input } => match find_landmark_pair_mut(doc, id) {
            Some(pair) => {
                *pair.location_mut(*input) = Some(position);
                true
            }
            None => false,
        },
        TpsDocumentElementId::NonParticipatingLandmark { id } => match find_non_participating_landmark_mut(doc, id) {
            Some(landmark) => {
                landmark.location = position;
                true
            }
            None => false,
        },
    }
}

/// Move a placed element by `delta`.
pub fn translate_element(doc: &mut TpsDocument, element: &TpsDocumentElementId, delta: Vector3<f64>) -> bool {
    match element {
        TpsDocumentElementId::Landmark { id, input } => {
            match find_landmark_pair_mut(doc, id).and_then(|p| p.location_mut(*input).as_mut()) {
                Some(location) => {
                    *location += delta;
                    true
                }
                None => false,
            }
        }
        TpsDocumentElementId::NonParticipatingLandmark { id } => match find_non_participating_landmark_mut(doc, id) {
            Some(landmark) => {
                landmark.location += delta;
                true
            }
            None => false,
        },
    }
}

/// Give an element a new id.
///
/// Renaming either side of a landmark renames the whole pair. Refused when
/// `new_id` is empty or already used by any element.
pub fn rename_element(doc: &mut TpsDocument, element: &TpsDocumentElementId, new_id: &str) -> bool {
    if new_id.is_empty() || contains_element_with_id(doc, new_id) {
        return false;
    }

    let slot = match element {
        TpsDocumentElementId::Landmark { id, .. } => find_landmark_pair_mut(doc, id).map(|p| &mut p.id),
        TpsDocumentElementId::NonParticipatingLandmark { id } => {
            find_non_participating_landmark_mut(doc, id).map(|l| &mut l.id)
        }
    };

    match slot {
        Some(id) => {
            *id = new_id.to_string();
            true
        }
        None => false,
    }
}

/// Remove an element. Returns whether anything was removed.
///
/// Clearing the last placed side of a landmark pair removes the pair.
pub fn delete_element_by_id(doc: &mut TpsDocument, element: &TpsDocumentElementId) -> bool {
    match element {
        TpsDocumentElementId::Landmark { id, input } => {
            let Some(index) = doc.landmark_pairs.iter().position(|p| p.id == *id) else {
                return false;
            };
            let pair = &mut doc.landmark_pairs[index];
            if pair.location_mut(*input).take().is_none() {
                return false;
            }
            if pair.is_empty() {
                let removed = doc.landmark_pairs.remove(index);
                trace!(target: "tps_document::edit", id = %removed.id, "removed empty pair");
            }
            true
        }
        TpsDocumentElementId::NonParticipatingLandmark { id } => {
            let before = doc.non_participating_landmarks.len();
            doc.non_participating_landmarks.retain(|l| l.id != *id);
            doc.non_participating_landmarks.len() != before
        }
    }
}

/// Remove every landmark pair. Returns whether there were any.
pub fn clear_all_landmarks(doc: &mut TpsDocument) -> bool {
    let had_any = !doc.landmark_pairs.is_empty();
    doc.landmark_pairs.clear();
    had_any
}

/// Remove every non-participating landmark. Returns whether there were any.
pub fn clear_all_non_participating_landmarks(doc: &mut TpsDocument) -> bool {
    let had_any = !doc.non_participating_landmarks.is_empty();
    doc.non_participating_landmarks.clear();
    had_any
}
