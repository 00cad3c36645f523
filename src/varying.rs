use crate::state::{DiagramState, Path, PropertyValue, Value, find_shape};

/// Refresh the flat optimizer vector and the translation's GPI fields from
/// the updated shapes. Index `i` of the vector changes if and only if
/// varying-path `i` addresses an existing graphical-primitive field; every
/// other index is left numerically unchanged. Pure function of its input:
/// it never invents varying paths and never touches non-GPI fields.
pub fn sync_varying_state(mut state: DiagramState) -> DiagramState {
    for (index, path) in state.varying_paths.iter().enumerate() {
        let Path::PropertyPath(substance, field, property) = path else {
            continue;
        };

        let Some(shape_name) = state
            .translation
            .gpi(substance, field)
            .and_then(|(_, gpi)| gpi.get("name"))
            .and_then(|cell| cell.value().as_str())
            .map(str::to_string)
        else {
            continue;
        };

        let Some(value) = find_shape(&state.shapes, &shape_name)
            .and_then(|shape| shape.float_property(property))
        else {
            continue;
        };

        state.varying_state[index] = value;
        if let Some((_, gpi)) = state.translation.gpi_mut(substance, field) {
            gpi.insert(
                property.clone(),
                PropertyValue::Resolved(Value::Float(value)),
            );
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        FieldDict, FieldEntry, OptStatus, PropertyMap, Shape, SolverParams, Translation,
    };

    fn circle_gpi(shape_name: &str, x: f64) -> FieldEntry {
        let mut properties = PropertyMap::new();
        properties.insert(
            "name".to_string(),
            PropertyValue::Resolved(Value::Str(shape_name.to_string())),
        );
        properties.insert("x".to_string(), PropertyValue::Resolved(Value::Float(x)));
        FieldEntry::Gpi("Circle".to_string(), properties)
    }

    fn two_path_state() -> DiagramState {
        let mut dict = FieldDict::new();
        dict.insert("shape".to_string(), circle_gpi("c1 shape", 1.0));
        dict.insert(
            "weight".to_string(),
            FieldEntry::Plain(Value::Float(7.0)),
        );
        DiagramState {
            shapes: vec![
                Shape::new("Circle", "c1 shape").with("x", Value::Float(50.0)),
            ],
            translation: Translation {
                entries: vec![("C1".to_string(), dict)],
            },
            varying_state: vec![1.0, 99.0],
            varying_paths: vec![
                Path::PropertyPath("C1".into(), "shape".into(), "x".into()),
                Path::PropertyPath("C1".into(), "weight".into(), "x".into()),
            ],
            pending_paths: vec![],
            shape_ordering: vec!["c1 shape".to_string()],
            params: SolverParams {
                opt_status: OptStatus::UnconstrainedRunning,
            },
        }
    }

    #[test]
    fn updates_only_indices_addressing_gpi_fields() {
        let state = sync_varying_state(two_path_state());
        assert_eq!(state.varying_state, vec![50.0, 99.0]);
    }

    #[test]
    fn refreshes_the_translation_cell() {
        let state = sync_varying_state(two_path_state());
        let (_, gpi) = state.translation.gpi("C1", "shape").unwrap();
        assert_eq!(
            gpi.get("x"),
            Some(&PropertyValue::Resolved(Value::Float(50.0)))
        );
    }

    #[test]
    fn non_gpi_fields_pass_through_unchanged() {
        let state = sync_varying_state(two_path_state());
        let dict = state.translation.field_dict("C1").unwrap();
        assert_eq!(
            dict.get("weight"),
            Some(&FieldEntry::Plain(Value::Float(7.0)))
        );
    }

    #[test]
    fn same_input_gives_same_output() {
        let a = sync_varying_state(two_path_state());
        let b = sync_varying_state(two_path_state());
        assert_eq!(a, b);
    }
}
