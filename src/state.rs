use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar or compound payload carried by a property cell. Serializes in the
/// upstream solver's `{"tag": ..., "contents": ...}` wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "contents")]
pub enum Value {
    Float(f64),
    Int(i64),
    Str(String),
    Bool(bool),
    Pt([f64; 2]),
    List(Vec<f64>),
    PtList(Vec<[f64; 2]>),
    Color([f64; 4]),
}

impl Value {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A value cell. `Resolved` once its dependency is known; a cell is never
/// pending again within one synchronization pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "contents")]
pub enum PropertyValue {
    Resolved(Value),
    Pending(Value),
}

impl PropertyValue {
    pub fn value(&self) -> &Value {
        match self {
            PropertyValue::Resolved(v) | PropertyValue::Pending(v) => v,
        }
    }

    pub fn value_mut(&mut self) -> &mut Value {
        match self {
            PropertyValue::Resolved(v) | PropertyValue::Pending(v) => v,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PropertyValue::Pending(_))
    }
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A concrete drawable shape: unique name, type tag, property dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub kind: String,
    pub name: String,
    pub properties: PropertyMap,
}

impl Shape {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            properties: BTreeMap::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn float_property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).and_then(|cell| cell.value().as_float())
    }

    pub fn str_property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(|cell| cell.value().as_str())
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.properties
            .insert(name.to_string(), PropertyValue::Resolved(value));
    }

    /// Builder form of [`Shape::set`], for tests and fixtures.
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.set(name, value);
        self
    }
}

pub fn find_shape<'a>(shapes: &'a [Shape], name: &str) -> Option<&'a Shape> {
    shapes.iter().find(|shape| shape.name == name)
}

/// One field of a substance object. Graphical-primitive-instance fields bind
/// the object to a drawable shape; anything else is carried through opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "contents")]
pub enum FieldEntry {
    Gpi(String, PropertyMap),
    Plain(Value),
}

impl FieldEntry {
    pub fn as_gpi(&self) -> Option<(&str, &PropertyMap)> {
        match self {
            FieldEntry::Gpi(kind, properties) => Some((kind, properties)),
            FieldEntry::Plain(_) => None,
        }
    }

    pub fn as_gpi_mut(&mut self) -> Option<(&str, &mut PropertyMap)> {
        match self {
            FieldEntry::Gpi(kind, properties) => Some((kind.as_str(), properties)),
            FieldEntry::Plain(_) => None,
        }
    }
}

pub type FieldDict = BTreeMap<String, FieldEntry>;

/// Ordered (substance-object-name, field-dictionary) pairs. Substance names
/// are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub entries: Vec<(String, FieldDict)>,
}

impl Translation {
    pub fn field_dict(&self, substance: &str) -> Option<&FieldDict> {
        self.entries
            .iter()
            .find(|(name, _)| name == substance)
            .map(|(_, dict)| dict)
    }

    pub fn field_dict_mut(&mut self, substance: &str) -> Option<&mut FieldDict> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == substance)
            .map(|(_, dict)| dict)
    }

    pub fn gpi(&self, substance: &str, field: &str) -> Option<(&str, &PropertyMap)> {
        self.field_dict(substance)?.get(field)?.as_gpi()
    }

    pub fn gpi_mut(&mut self, substance: &str, field: &str) -> Option<(&str, &mut PropertyMap)> {
        self.field_dict_mut(substance)?.get_mut(field)?.as_gpi_mut()
    }
}

/// Address of one value cell. Property paths are resolvable; field paths are
/// carried on the wire but unsupported for resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "contents")]
pub enum Path {
    PropertyPath(String, String, String),
    FieldPath(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum OptStatus {
    NewIter,
    UnconstrainedRunning,
    UnconstrainedConverged,
    EpConverged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverParams {
    pub opt_status: OptStatus,
}

/// The aggregate handed over by the upstream solver each cycle. Received by
/// value, returned updated; never shared mutably across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramState {
    pub shapes: Vec<Shape>,
    pub translation: Translation,
    pub varying_state: Vec<f64>,
    pub varying_paths: Vec<Path>,
    pub pending_paths: Vec<Path>,
    pub shape_ordering: Vec<String>,
    pub params: SolverParams,
}

impl DiagramState {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_round_trips_tagged_form() {
        let json = r#"{"tag":"Float","contents":3.5}"#;
        let value: Value = serde_json::from_str(json).unwrap();
        assert_eq!(value, Value::Float(3.5));
        assert_eq!(serde_json::to_string(&value).unwrap(), json);
    }

    #[test]
    fn property_path_round_trips() {
        let json = r#"{"tag":"PropertyPath","contents":["A","shape","w"]}"#;
        let path: Path = serde_json::from_str(json).unwrap();
        assert_eq!(
            path,
            Path::PropertyPath("A".into(), "shape".into(), "w".into())
        );
        assert_eq!(serde_json::to_string(&path).unwrap(), json);
    }

    #[test]
    fn opt_status_uses_bare_tag() {
        let status: OptStatus = serde_json::from_str(r#"{"tag":"NewIter"}"#).unwrap();
        assert_eq!(status, OptStatus::NewIter);
    }

    #[test]
    fn gpi_field_serializes_as_pair() {
        let mut properties = PropertyMap::new();
        properties.insert(
            "name".to_string(),
            PropertyValue::Resolved(Value::Str("c1 shape".to_string())),
        );
        let entry = FieldEntry::Gpi("Circle".to_string(), properties);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.starts_with(r#"{"tag":"Gpi","contents":["Circle","#));
        let back: FieldEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn translation_lookup_by_substance_and_field() {
        let mut dict = FieldDict::new();
        dict.insert(
            "shape".to_string(),
            FieldEntry::Gpi("Circle".to_string(), PropertyMap::new()),
        );
        dict.insert(
            "weight".to_string(),
            FieldEntry::Plain(Value::Float(1.0)),
        );
        let translation = Translation {
            entries: vec![("C1".to_string(), dict)],
        };
        assert!(translation.gpi("C1", "shape").is_some());
        assert!(translation.gpi("C1", "weight").is_none());
        assert!(translation.gpi("C2", "shape").is_none());
    }
}
