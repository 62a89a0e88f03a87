//! Undoable edits on an [`UndoableTpsDocument`].
//!
//! Each action edits the scratch document and commits it with a short
//! message. Actions that turn out to change nothing don't commit, so they
//! never add empty entries to the history. File-based actions read and
//! parse everything before touching the document: on error, the document
//! is left as it was.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;
use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use tps_warp::tracing_ext::log_io_operation;
use tps_warp::{Mesh, TpsWarpOptions, validate_mesh_data};
use tracing::info;

use crate::cache::TpsResultCache;
use crate::document::{TpsDocument, TpsDocumentElementId, TpsDocumentInputIdentifier, UndoableTpsDocument};
use crate::error::{DocumentError, DocumentResult};
use crate::helpers::{
    add_landmark_to_input, add_non_participating_landmark, clear_all_landmarks,
    clear_all_non_participating_landmarks, delete_element_by_id, get_named_landmark_pairs, rename_element,
    set_element_location, translate_element,
};
use crate::landmark_csv::{
    CsvExportOptions, CsvLandmark, read_landmarks_from_csv, write_landmarks_to_csv, write_paired_landmarks_to_csv,
};

// =============================================================================
// Landmarks
// =============================================================================

/// Place a landmark on one input. Returns the id of the pair it landed in.
pub fn action_add_landmark(
    doc: &mut UndoableTpsDocument,
    which: TpsDocumentInputIdentifier,
    position: Point3<f64>,
) -> String {
    let id = add_landmark_to_input(doc.upd_scratch(), which, position, None);
    doc.commit_scratch("added landmark");
    id
}

pub fn action_add_non_participating_landmark(doc: &mut UndoableTpsDocument, position: Point3<f64>) -> String {
    let id = add_non_participating_landmark(doc.upd_scratch(), position, None);
    doc.commit_scratch("added non-participating landmark");
    id
}

/// Place one side of an existing landmark pair.
pub fn action_set_landmark_position(
    doc: &mut UndoableTpsDocument,
    id: &str,
    which: TpsDocumentInputIdentifier,
    position: Point3<f64>,
) {
    let element = TpsDocumentElementId::landmark(id, which);
    if set_element_location(doc.upd_scratch(), &element, position) {
        doc.commit_scratch("set landmark position");
    }
}

pub fn action_set_non_participating_landmark_position(
    doc: &mut UndoableTpsDocument,
    id: &str,
    position: Point3<f64>,
) {
    let element = TpsDocumentElementId::non_participating_landmark(id);
    if set_element_location(doc.upd_scratch(), &element, position) {
        doc.commit_scratch("change non-participating landmark position");
    }
}

/// Give a landmark pair a new id. Ignored if `new_id` is already taken.
pub fn action_rename_landmark(doc: &mut UndoableTpsDocument, id: &str, new_id: &str) {
    let element = TpsDocumentElementId::landmark(id, TpsDocumentInputIdentifier::Source);
    if rename_element(doc.upd_scratch(), &element, new_id) {
        doc.commit_scratch("set landmark name");
    }
}

/// Give a non-participating landmark a new id. Ignored if `new_id` is already taken.
pub fn action_rename_non_participating_landmark(doc: &mut UndoableTpsDocument, id: &str, new_id: &str) {
    let element = TpsDocumentElementId::non_participating_landmark(id);
    if rename_element(doc.upd_scratch(), &element, new_id) {
        doc.commit_scratch("set non-participating landmark name");
    }
}

/// Move a placed element by `delta`.
pub fn action_translate_element(doc: &mut UndoableTpsDocument, element: &TpsDocumentElementId, delta: Vector3<f64>) {
    if translate_element(doc.upd_scratch(), element, delta) {
        doc.commit_scratch("translated element");
    }
}

/// Delete every element in `elements`, committing once if anything was deleted.
pub fn action_delete_elements_by_id(doc: &mut UndoableTpsDocument, elements: &HashSet<TpsDocumentElementId>) {
    let scratch = doc.upd_scratch();
    let mut something_deleted = false;
    for element in elements {
        something_deleted |= delete_element_by_id(scratch, element);
    }

    if something_deleted {
        doc.commit_scratch("deleted elements");
    }
}

pub fn action_clear_all_landmarks(doc: &mut UndoableTpsDocument) {
    if clear_all_landmarks(doc.upd_scratch()) {
        doc.commit_scratch("cleared all landmarks");
    }
}

pub fn action_clear_all_non_participating_landmarks(doc: &mut UndoableTpsDocument) {
    if clear_all_non_participating_landmarks(doc.upd_scratch()) {
        doc.commit_scratch("cleared all non-participating landmarks");
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Change the blend factor without recording history.
///
/// For live previews such as slider drags. Follow up with
/// [`action_set_blend_factor`] (or roll back) when the interaction ends.
pub fn action_set_blend_factor_without_committing(doc: &mut UndoableTpsDocument, factor: f64) {
    doc.upd_scratch().blending_factor = factor;
}

pub fn action_set_blend_factor(doc: &mut UndoableTpsDocument, factor: f64) {
    action_set_blend_factor_without_committing(doc, factor);
    doc.commit_scratch("changed blend factor");
}

pub fn action_set_recalculating_normals(doc: &mut UndoableTpsDocument, enabled: bool) {
    doc.upd_scratch().recalculate_normals = enabled;
    doc.commit_scratch(if enabled {
        "enabled recalculating normals"
    } else {
        "disabled recalculating normals"
    });
}

pub fn action_set_warp_options(doc: &mut UndoableTpsDocument, options: TpsWarpOptions) {
    doc.upd_scratch().warp_options = options;
    doc.commit_scratch("changed warp options");
}

/// Replace the document with a fresh default one. Undoable.
pub fn action_create_new_document(doc: &mut UndoableTpsDocument) {
    *doc.upd_scratch() = TpsDocument::default();
    doc.commit_scratch("created new document");
}

// =============================================================================
// Meshes
// =============================================================================

/// Replace one input mesh. Landmarks are untouched.
///
/// # Errors
///
/// Rejects empty meshes, out-of-range face indices and non-finite
/// coordinates; the document is unchanged.
pub fn action_load_mesh(
    doc: &mut UndoableTpsDocument,
    which: TpsDocumentInputIdentifier,
    mesh: Mesh,
) -> DocumentResult<()> {
    validate_mesh_data(&mesh)?;
    *doc.upd_scratch().mesh_mut(which) = Arc::new(mesh);
    doc.commit_scratch(format!("changed {} mesh", which));
    Ok(())
}

/// Load an STL or OBJ file into one input.
///
/// # Errors
///
/// Fails if the file can't be loaded; the document is unchanged.
pub fn action_load_mesh_file(
    doc: &mut UndoableTpsDocument,
    which: TpsDocumentInputIdentifier,
    path: impl AsRef<Path>,
) -> DocumentResult<()> {
    action_load_mesh(doc, which, Mesh::load(path)?)
}

/// Write the warped source mesh for `doc` to an STL or OBJ file.
pub fn action_save_warped_mesh(
    doc: &TpsDocument,
    cache: &mut TpsResultCache,
    path: impl AsRef<Path>,
) -> DocumentResult<()> {
    cache.lookup(doc).save(path)?;
    Ok(())
}

// =============================================================================
// Landmark tables
// =============================================================================

fn open_csv(path: &Path) -> DocumentResult<BufReader<File>> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(e) => {
            log_io_operation("load", path, Some("csv"), false);
            Err(DocumentError::io_read(path, e))
        }
    }
}

fn create_csv(path: &Path) -> DocumentResult<BufWriter<File>> {
    match File::create(path) {
        Ok(file) => Ok(BufWriter::new(file)),
        Err(e) => {
            log_io_operation("save", path, Some("csv"), false);
            Err(DocumentError::io_write(path, e))
        }
    }
}

/// Add every landmark in a CSV stream to one input.
///
/// Named rows overwrite (or create) the pair with that id; unnamed rows
/// pair up first-fit. Returns how many rows were loaded and commits only
/// if there were any.
pub fn action_load_landmarks_from_csv(
    doc: &mut UndoableTpsDocument,
    which: TpsDocumentInputIdentifier,
    reader: impl Read,
) -> DocumentResult<usize> {
    let landmarks = read_landmarks_from_csv(reader)?;
    if landmarks.is_empty() {
        return Ok(0);
    }

    let scratch = doc.upd_scratch();
    for landmark in &landmarks {
        add_landmark_to_input(scratch, which, landmark.position, landmark.name.as_deref());
    }
    doc.commit_scratch("loaded landmarks");

    info!(target: "tps_document::csv", count = landmarks.len(), %which, "loaded landmarks");
    Ok(landmarks.len())
}

pub fn action_load_landmarks_from_csv_file(
    doc: &mut UndoableTpsDocument,
    which: TpsDocumentInputIdentifier,
    path: impl AsRef<Path>,
) -> DocumentResult<usize> {
    let path = path.as_ref();
    let result = action_load_landmarks_from_csv(doc, which, open_csv(path)?);
    log_io_operation("load", path, Some("csv"), result.is_ok());
    result
}

/// Add every landmark in a CSV stream as a non-participating landmark.
pub fn action_load_non_participating_landmarks_from_csv(
    doc: &mut UndoableTpsDocument,
    reader: impl Read,
) -> DocumentResult<usize> {
    let landmarks = read_landmarks_from_csv(reader)?;
    if landmarks.is_empty() {
        return Ok(0);
    }

    let scratch = doc.upd_scratch();
    for landmark in &landmarks {
        add_non_participating_landmark(scratch, landmark.position, landmark.name.as_deref());
    }
    doc.commit_scratch("added non-participating landmarks");
    Ok(landmarks.len())
}

pub fn action_load_non_participating_landmarks_from_csv_file(
    doc: &mut UndoableTpsDocument,
    path: impl AsRef<Path>,
) -> DocumentResult<usize> {
    let path = path.as_ref();
    let result = action_load_non_participating_landmarks_from_csv(doc, open_csv(path)?);
    log_io_operation("load", path, Some("csv"), result.is_ok());
    result
}

/// Write every landmark placed on `which`, paired or not.
pub fn action_save_landmarks_to_csv(
    doc: &TpsDocument,
    which: TpsDocumentInputIdentifier,
    path: impl AsRef<Path>,
    options: CsvExportOptions,
) -> DocumentResult<()> {
    let path = path.as_ref();
    let landmarks: Vec<CsvLandmark> = doc
        .landmark_pairs
        .iter()
        .filter_map(|p| Some(CsvLandmark::named(p.id.clone(), p.location(which)?)))
        .collect();

    let result = write_landmarks_to_csv(create_csv(path)?, &landmarks, options);
    log_io_operation("save", path, Some("csv"), result.is_ok());
    result
}

/// Write fully paired landmarks as six-column rows.
pub fn action_save_paired_landmarks_to_csv(
    doc: &TpsDocument,
    path: impl AsRef<Path>,
    options: CsvExportOptions,
) -> DocumentResult<()> {
    let path = path.as_ref();
    let result = write_paired_landmarks_to_csv(create_csv(path)?, &get_named_landmark_pairs(doc), options);
    log_io_operation("save", path, Some("csv"), result.is_ok());
    result
}

pub fn action_save_non_participating_landmarks_to_csv(
    doc: &TpsDocument,
    path: impl AsRef<Path>,
    options: CsvExportOptions,
) -> DocumentResult<()> {
    let path = path.as_ref();
    let landmarks: Vec<CsvLandmark> = doc
        .non_participating_landmarks
        .iter()
        .map(|l| CsvLandmark::named(l.id.clone(), l.location))
        .collect();

    let result = write_landmarks_to_csv(create_csv(path)?, &landmarks, options);
    log_io_operation("save", path, Some("csv"), result.is_ok());
    result
}

/// Write the non-participating landmarks after warping them.
pub fn action_save_warped_non_participating_landmarks_to_csv(
    doc: &TpsDocument,
    cache: &mut TpsResultCache,
    path: impl AsRef<Path>,
    options: CsvExportOptions,
) -> DocumentResult<()> {
    let path = path.as_ref();
    let landmarks: Vec<CsvLandmark> = doc
        .non_participating_landmarks
        .iter()
        .zip(cache.warped_non_participating_landmarks(doc))
        .map(|(l, warped)| CsvLandmark::named(l.id.clone(), *warped))
        .collect();

    let result = write_landmarks_to_csv(create_csv(path)?, &landmarks, options);
    log_io_operation("save", path, Some("csv"), result.is_ok());
    result
}

// =============================================================================
// History
// =============================================================================

pub fn action_undo(doc: &mut UndoableTpsDocument) {
    doc.undo();
}

pub fn action_redo(doc: &mut UndoableTpsDocument) {
    doc.redo();
}

#[cfg(test)]
mod tests {
    use super::*;
    use TpsDocumentInputIdentifier::{Destination, Source};
    use approx::assert_relative_eq;
    use tempfile::TempDir;
    use tps_warp::shapes;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn test_each_action_commits_once() {
        let mut doc = UndoableTpsDocument::default();
        action_add_landmark(&mut doc, Source, p(0.0, 0.0, 0.0));
        action_add_landmark(&mut doc, Destination, p(1.0, 0.0, 0.0));
        assert_eq!(doc.num_undo_entries(), 2);
        assert_eq!(doc.head().message(), "added landmark");
        assert_eq!(doc.scratch(), doc.head().value());
    }

    #[test]
    fn test_blend_preview_then_commit() {
        let mut doc = UndoableTpsDocument::default();
        for step in 1..=10 {
            action_set_blend_factor_without_committing(&mut doc, step as f64 / 10.0);
        }
        assert_eq!(doc.num_undo_entries(), 0);
        assert_eq!(doc.scratch().blending_factor, 1.0);

        action_set_blend_factor_without_committing(&mut doc, 0.3);
        assert_eq!(doc.head().value().blending_factor, 1.0);
        action_set_blend_factor(&mut doc, 0.4);
        assert_eq!(doc.num_undo_entries(), 1);
        assert_eq!(doc.head().value().blending_factor, 0.4);
    }

    #[test]
    fn test_blend_preview_can_be_rolled_back() {
        let mut doc = UndoableTpsDocument::default();
        action_set_blend_factor_without_committing(&mut doc, 0.2);
        doc.rollback();
        assert_eq!(doc.scratch().blending_factor, 1.0);
    }

    #[test]
    fn test_delete_commits_only_on_change() {
        let mut doc = UndoableTpsDocument::default();
        let id = action_add_landmark(&mut doc, Source, p(0.0, 0.0, 0.0));

        let ghost = HashSet::from([TpsDocumentElementId::landmark("ghost", Source)]);
        action_delete_elements_by_id(&mut doc, &ghost);
        assert_eq!(doc.num_undo_entries(), 1);

        let real = HashSet::from([
            TpsDocumentElementId::landmark(&id, Source),
            TpsDocumentElementId::landmark(&id, Destination),
        ]);
        action_delete_elements_by_id(&mut doc, &real);
        assert_eq!(doc.num_undo_entries(), 2);
        assert!(doc.scratch().landmark_pairs.is_empty());

        action_undo(&mut doc);
        assert_eq!(doc.scratch().landmark_pairs.len(), 1);
    }

    #[test]
    fn test_rename_refuses_taken_ids() {
        let mut doc = UndoableTpsDocument::default();
        let a = action_add_landmark(&mut doc, Source, p(0.0, 0.0, 0.0));
        let b = action_add_landmark(&mut doc, Source, p(1.0, 0.0, 0.0));

        action_rename_landmark(&mut doc, &a, &b);
        assert_eq!(doc.num_undo_entries(), 2);

        action_rename_landmark(&mut doc, &a, "hip");
        assert_eq!(doc.num_undo_entries(), 3);
        assert_eq!(doc.scratch().landmark_pairs[0].id, "hip");
    }

    #[test]
    fn test_non_participating_landmark_actions() {
        let mut doc = UndoableTpsDocument::default();
        let id = action_add_non_participating_landmark(&mut doc, p(0.0, 0.0, 0.0));
        action_set_non_participating_landmark_position(&mut doc, &id, p(0.0, 1.0, 0.0));
        action_translate_element(
            &mut doc,
            &TpsDocumentElementId::non_participating_landmark(&id),
            Vector3::new(0.0, 0.0, 2.0),
        );
        action_rename_non_participating_landmark(&mut doc, &id, "marker");

        let scratch = doc.scratch();
        assert_eq!(scratch.non_participating_landmarks[0].id, "marker");
        assert_eq!(scratch.non_participating_landmarks[0].location, p(0.0, 1.0, 2.0));
        assert_eq!(doc.num_undo_entries(), 4);

        action_clear_all_non_participating_landmarks(&mut doc);
        action_clear_all_non_participating_landmarks(&mut doc);
        assert_eq!(doc.num_undo_entries(), 5);
    }

    #[test]
    fn test_load_mesh_keeps_landmarks() {
        let mut doc = UndoableTpsDocument::default();
        action_add_landmark(&mut doc, Source, p(0.0, 0.0, 0.0));
        action_load_mesh(&mut doc, Source, shapes::y_to_y_cylinder(6)).unwrap();

        assert_eq!(doc.scratch().landmark_pairs.len(), 1);
        assert_eq!(*doc.scratch().source_mesh, shapes::y_to_y_cylinder(6));
        assert_eq!(doc.head().message(), "changed source mesh");
    }

    #[test]
    fn test_load_mesh_rejects_bad_faces() {
        let mut doc = UndoableTpsDocument::default();
        let before = doc.scratch().clone();
        let mesh = Mesh::from_parts([p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)], vec![[0, 1, 7]]);

        let err = action_load_mesh(&mut doc, Source, mesh).unwrap_err();
        assert_eq!(err.code(), crate::DocumentErrorCode::Warp);
        assert_eq!(*doc.scratch(), before);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_create_new_document_is_undoable() {
        let mut doc = UndoableTpsDocument::default();
        action_add_landmark(&mut doc, Source, p(0.0, 0.0, 0.0));
        action_set_recalculating_normals(&mut doc, true);
        action_create_new_document(&mut doc);
        assert_eq!(*doc.scratch(), TpsDocument::default());

        action_undo(&mut doc);
        assert!(doc.scratch().recalculate_normals);
        action_redo(&mut doc);
        assert!(!doc.scratch().recalculate_normals);
    }

    #[test]
    fn test_load_landmarks_from_csv() {
        let mut doc = UndoableTpsDocument::default();
        let loaded = action_load_landmarks_from_csv(&mut doc, Source, "0,0,0\n1,0,0\nbad\n".as_bytes()).unwrap();
        assert_eq!(loaded, 2);
        let loaded = action_load_landmarks_from_csv(&mut doc, Destination, "0,1,0\n".as_bytes()).unwrap();
        assert_eq!(loaded, 1);

        let scratch = doc.scratch();
        assert_eq!(scratch.landmark_pairs.len(), 2);
        assert!(scratch.landmark_pairs[0].is_fully_paired());
        assert!(!scratch.landmark_pairs[1].is_fully_paired());
        assert_eq!(doc.num_undo_entries(), 2);

        assert_eq!(action_load_landmarks_from_csv(&mut doc, Source, "x,y,z\n".as_bytes()).unwrap(), 0);
        assert_eq!(doc.num_undo_entries(), 2);
    }

    #[test]
    fn test_missing_files_leave_document_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut doc = UndoableTpsDocument::default();
        let before = doc.scratch().clone();

        let err = action_load_landmarks_from_csv_file(&mut doc, Source, dir.path().join("missing.csv")).unwrap_err();
        assert_eq!(err.code().as_str(), "TPSDOC-1001");
        let err = action_load_mesh_file(&mut doc, Source, dir.path().join("missing.obj")).unwrap_err();
        assert!(matches!(err, DocumentError::Warp(_)));

        assert_eq!(*doc.scratch(), before);
        assert_eq!(doc.num_undo_entries(), 0);
    }

    #[test]
    fn test_csv_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("source.csv");

        let mut original = UndoableTpsDocument::default();
        action_add_landmark(&mut original, Source, p(0.5, -1.0, 2.0));
        action_add_landmark(&mut original, Source, p(3.0, 4.0, 5.0));
        action_rename_landmark(&mut original, "landmark_1", "wrist");
        let options = CsvExportOptions::default();
        action_save_landmarks_to_csv(original.scratch(), Source, &path, options).unwrap();

        let mut reloaded = UndoableTpsDocument::default();
        action_load_landmarks_from_csv_file(&mut reloaded, Source, &path).unwrap();
        assert_eq!(reloaded.scratch().landmark_pairs, original.scratch().landmark_pairs);
    }

    #[test]
    fn test_save_warped_outputs() {
        let dir = TempDir::new().unwrap();
        let mut doc = UndoableTpsDocument::default();
        action_add_landmark(&mut doc, Source, p(0.0, 0.0, 0.0));
        action_add_landmark(&mut doc, Destination, p(1.0, 0.0, 0.0));
        action_add_non_participating_landmark(&mut doc, p(0.0, 0.0, 0.0));

        let mut cache = TpsResultCache::new();
        let csv_path = dir.path().join("warped.csv");
        action_save_warped_non_participating_landmarks_to_csv(
            doc.scratch(),
            &mut cache,
            &csv_path,
            CsvExportOptions::bare(),
        )
        .unwrap();
        let written = std::fs::read_to_string(&csv_path).unwrap();
        let fields: Vec<f64> = written.trim().split(',').map(|f| f.parse().unwrap()).collect();
        assert_relative_eq!(fields[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(fields[1], 0.0, epsilon = 1e-4);

        let mesh_path = dir.path().join("warped.obj");
        action_save_warped_mesh(doc.scratch(), &mut cache, &mesh_path).unwrap();
        assert!(mesh_path.exists());
        assert_eq!(cache.stats().solves, 1);
    }
}
