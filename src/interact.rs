use crate::error::CanvasError;
use crate::resolve::propagate_update;
use crate::state::{DiagramState, OptStatus, Value};
use crate::varying::sync_varying_state;
use log::error;

/// Apply one drag delta to the named shape and return the next authoritative
/// state: the shape moves opposite the pointer delta, the solver is told a
/// new iteration has begun, pending paths are re-resolved, and the flat
/// vector is re-synchronized. Exactly one state transition per delta; an
/// unknown shape name fails loudly before anything is touched.
pub fn drag_shape(
    mut state: DiagramState,
    name: &str,
    dx: f64,
    dy: f64,
) -> Result<DiagramState, CanvasError> {
    let Some(shape) = state.shapes.iter_mut().find(|shape| shape.name == name) else {
        return Err(CanvasError::ShapeNotFound(name.to_string()));
    };

    for (property, delta) in [("x", dx), ("y", dy)] {
        match shape.properties.get_mut(property) {
            Some(cell) => {
                if let Value::Float(v) = cell.value_mut() {
                    *v -= delta;
                } else {
                    error!("shape {name:?} property {property:?} is not a scalar");
                }
            }
            None => error!("shape {name:?} has no {property:?} coordinate"),
        }
    }

    state.params.opt_status = OptStatus::NewIter;
    Ok(sync_varying_state(propagate_update(state)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        FieldDict, FieldEntry, Path, PropertyMap, PropertyValue, Shape, SolverParams, Translation,
    };

    fn drag_state() -> DiagramState {
        let mut gpi = PropertyMap::new();
        gpi.insert(
            "name".to_string(),
            PropertyValue::Resolved(Value::Str("c1".to_string())),
        );
        gpi.insert(
            "x".to_string(),
            PropertyValue::Resolved(Value::Float(100.0)),
        );
        gpi.insert(
            "y".to_string(),
            PropertyValue::Resolved(Value::Float(50.0)),
        );
        let mut dict = FieldDict::new();
        dict.insert("icon".to_string(), FieldEntry::Gpi("Circle".to_string(), gpi));

        DiagramState {
            shapes: vec![
                Shape::new("Circle", "c1")
                    .with("x", Value::Float(100.0))
                    .with("y", Value::Float(50.0)),
                Shape::new("Circle", "c2")
                    .with("x", Value::Float(-20.0))
                    .with("y", Value::Float(-30.0)),
            ],
            translation: Translation {
                entries: vec![("C1".to_string(), dict)],
            },
            varying_state: vec![100.0, 50.0],
            varying_paths: vec![
                Path::PropertyPath("C1".into(), "icon".into(), "x".into()),
                Path::PropertyPath("C1".into(), "icon".into(), "y".into()),
            ],
            pending_paths: vec![],
            shape_ordering: vec!["c1".to_string(), "c2".to_string()],
            params: SolverParams {
                opt_status: OptStatus::EpConverged,
            },
        }
    }

    #[test]
    fn drag_moves_opposite_the_pointer_delta() {
        let state = drag_shape(drag_state(), "c1", 5.0, 3.0).unwrap();
        let c1 = &state.shapes[0];
        assert_eq!(c1.float_property("x"), Some(95.0));
        assert_eq!(c1.float_property("y"), Some(47.0));
    }

    #[test]
    fn drag_leaves_other_shapes_untouched() {
        let state = drag_shape(drag_state(), "c1", 5.0, 3.0).unwrap();
        let c2 = &state.shapes[1];
        assert_eq!(c2.float_property("x"), Some(-20.0));
        assert_eq!(c2.float_property("y"), Some(-30.0));
    }

    #[test]
    fn drag_marks_a_new_iteration() {
        let state = drag_shape(drag_state(), "c1", 1.0, 1.0).unwrap();
        assert_eq!(state.params.opt_status, OptStatus::NewIter);
    }

    #[test]
    fn drag_pushes_coordinates_into_the_flat_vector() {
        let state = drag_shape(drag_state(), "c1", 5.0, 3.0).unwrap();
        assert_eq!(state.varying_state, vec![95.0, 47.0]);
    }

    #[test]
    fn unknown_shape_is_an_explicit_error() {
        let err = drag_shape(drag_state(), "ghost", 1.0, 1.0).unwrap_err();
        assert!(matches!(err, CanvasError::ShapeNotFound(_)));
    }
}
