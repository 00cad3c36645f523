use crate::state::{DiagramState, Path, PropertyValue, Shape, Translation, find_shape};
use log::error;

/// Resolve every pending property path against the measured shape list and
/// clear the pending list. Field paths are unsupported: they are dropped with
/// an error and the addressed cell is left untouched.
pub fn propagate_update(mut state: DiagramState) -> DiagramState {
    for path in &state.pending_paths {
        resolve_path(&mut state.translation, &state.shapes, path);
    }
    state.pending_paths.clear();
    state
}

/// Resolve one pending path in place. The GPI's own resolved `name` property
/// identifies the source shape; the shape's value for the requested property
/// is copied into the target cell and marked resolved. Last write wins when
/// several paths address the same cell.
pub fn resolve_path(translation: &mut Translation, shapes: &[Shape], path: &Path) {
    let (substance, field, property) = match path {
        Path::PropertyPath(substance, field, property) => (substance, field, property),
        Path::FieldPath(substance, field) => {
            error!("pending field paths are not supported: {substance}.{field}");
            return;
        }
    };

    let Some((_, gpi)) = translation.gpi_mut(substance, field) else {
        error!("pending path addresses no GPI field: {substance}.{field}.{property}");
        return;
    };

    let Some(shape_name) = gpi
        .get("name")
        .and_then(|cell| cell.value().as_str())
        .map(str::to_string)
    else {
        error!("GPI field {substance}.{field} has no resolved shape name");
        return;
    };

    let Some(shape) = find_shape(shapes, &shape_name) else {
        error!("no shape named {shape_name:?} for pending path {substance}.{field}.{property}");
        return;
    };

    let Some(cell) = shape.property(property) else {
        error!("shape {shape_name:?} has no property {property:?}");
        return;
    };

    let value = cell.value().clone();
    gpi.insert(property.clone(), PropertyValue::Resolved(value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        FieldDict, FieldEntry, OptStatus, PropertyMap, SolverParams, Value,
    };

    fn gpi_dict(shape_name: &str, pending: &[&str]) -> FieldDict {
        let mut properties = PropertyMap::new();
        properties.insert(
            "name".to_string(),
            PropertyValue::Resolved(Value::Str(shape_name.to_string())),
        );
        for property in pending {
            properties.insert(
                property.to_string(),
                PropertyValue::Pending(Value::Float(0.0)),
            );
        }
        let mut dict = FieldDict::new();
        dict.insert(
            "shape".to_string(),
            FieldEntry::Gpi("Text".to_string(), properties),
        );
        dict
    }

    fn state_with_pending() -> DiagramState {
        let shape = Shape::new("Text", "L1 shape")
            .with("w", Value::Float(42.0))
            .with("h", Value::Float(12.0))
            .with("string", Value::Str("label".to_string()));
        DiagramState {
            shapes: vec![shape],
            translation: Translation {
                entries: vec![("L1".to_string(), gpi_dict("L1 shape", &["w", "h"]))],
            },
            varying_state: vec![],
            varying_paths: vec![],
            pending_paths: vec![
                Path::PropertyPath("L1".into(), "shape".into(), "w".into()),
                Path::PropertyPath("L1".into(), "shape".into(), "h".into()),
            ],
            shape_ordering: vec!["L1 shape".to_string()],
            params: SolverParams {
                opt_status: OptStatus::UnconstrainedConverged,
            },
        }
    }

    #[test]
    fn resolves_pending_cells_from_shapes() {
        let state = propagate_update(state_with_pending());
        assert!(state.pending_paths.is_empty());
        let (_, gpi) = state.translation.gpi("L1", "shape").unwrap();
        assert_eq!(
            gpi.get("w"),
            Some(&PropertyValue::Resolved(Value::Float(42.0)))
        );
        assert_eq!(
            gpi.get("h"),
            Some(&PropertyValue::Resolved(Value::Float(12.0)))
        );
    }

    #[test]
    fn second_pass_over_resolved_translation_is_noop() {
        let once = propagate_update(state_with_pending());
        let twice = propagate_update(once.clone());
        assert_eq!(once.translation, twice.translation);
        assert!(twice.pending_paths.is_empty());
    }

    #[test]
    fn field_path_is_dropped_without_touching_cells() {
        let mut state = state_with_pending();
        state.pending_paths = vec![Path::FieldPath("L1".into(), "shape".into())];
        let state = propagate_update(state);
        assert!(state.pending_paths.is_empty());
        let (_, gpi) = state.translation.gpi("L1", "shape").unwrap();
        assert!(gpi.get("w").unwrap().is_pending());
    }

    #[test]
    fn last_write_wins_for_duplicate_paths() {
        let mut state = state_with_pending();
        state.pending_paths = vec![
            Path::PropertyPath("L1".into(), "shape".into(), "w".into()),
            Path::PropertyPath("L1".into(), "shape".into(), "w".into()),
        ];
        let state = propagate_update(state);
        let (_, gpi) = state.translation.gpi("L1", "shape").unwrap();
        assert_eq!(
            gpi.get("w"),
            Some(&PropertyValue::Resolved(Value::Float(42.0)))
        );
    }

    #[test]
    fn missing_substance_leaves_translation_unchanged() {
        let mut state = state_with_pending();
        state.pending_paths = vec![Path::PropertyPath("Z9".into(), "shape".into(), "w".into())];
        let before = state.translation.clone();
        let state = propagate_update(state);
        assert_eq!(state.translation, before);
    }
}
