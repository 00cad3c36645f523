use std::path::Path;

use diagram_canvas::pipeline::{PipelineServices, process_state};
use diagram_canvas::render::{LayerRegistry, ShapeRegistry, build_svg};
use diagram_canvas::resources::MemoryFetcher;
use diagram_canvas::state::{OptStatus, PropertyValue, Value};
use diagram_canvas::text_metrics::FixedMeasurer;
use diagram_canvas::{
    Config, DiagramState, ExportMeta, drag_shape, flatten_document,
};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).expect("fixture read failed")
}

fn fetcher() -> MemoryFetcher {
    MemoryFetcher::new().with("logo.svg", &fixture("logo.svg"))
}

fn processed_state() -> DiagramState {
    let state = DiagramState::from_json(&fixture("basic_state.json")).expect("state parse failed");
    let fetcher = fetcher();
    let measurer = FixedMeasurer::default();
    let services = PipelineServices {
        measurer: &measurer,
        fetcher: &fetcher,
    };
    process_state(state, &services, &Config::default().theme)
}

#[test]
fn state_json_round_trips() {
    let state = DiagramState::from_json(&fixture("basic_state.json")).unwrap();
    let back = DiagramState::from_json(&state.to_json().unwrap()).unwrap();
    assert_eq!(state, back);
}

#[test]
fn pipeline_orders_filters_and_resolves() {
    let state = processed_state();

    assert!(state.pending_paths.is_empty());
    let names: Vec<_> = state.shapes.iter().map(|shape| shape.name.as_str()).collect();
    // ordering applied, then the empty label dropped
    assert_eq!(names, vec!["i1 shape", "c1 shape", "l1 shape"]);

    // "energy" measured on the deterministic character grid at 16px
    let (_, gpi) = state.translation.gpi("L1", "shape").unwrap();
    assert_eq!(
        gpi.get("w"),
        Some(&PropertyValue::Resolved(Value::Float(6.0 * 0.6 * 16.0)))
    );
    assert_eq!(
        gpi.get("h"),
        Some(&PropertyValue::Resolved(Value::Float(1.2 * 16.0)))
    );

    // the non-GPI field is carried through untouched
    let dict = state.translation.field_dict("L1").unwrap();
    assert!(dict.contains_key("weight"));
}

#[test]
fn resolution_matches_source_shape_values() {
    let state = processed_state();
    let label = state
        .shapes
        .iter()
        .find(|shape| shape.name == "l1 shape")
        .unwrap();
    let (_, gpi) = state.translation.gpi("L1", "shape").unwrap();
    assert_eq!(
        gpi.get("w").unwrap().value().as_float(),
        label.float_property("w")
    );
}

#[test]
fn drag_after_processing_updates_state_and_vector() {
    let state = processed_state();
    let dragged = drag_shape(state, "c1 shape", 5.0, 3.0).unwrap();

    let c1 = dragged
        .shapes
        .iter()
        .find(|shape| shape.name == "c1 shape")
        .unwrap();
    assert_eq!(c1.float_property("x"), Some(95.0));
    assert_eq!(c1.float_property("y"), Some(37.0));
    assert_eq!(dragged.params.opt_status, OptStatus::NewIter);
    assert_eq!(dragged.varying_state, vec![95.0, 37.0]);

    let label = dragged
        .shapes
        .iter()
        .find(|shape| shape.name == "l1 shape")
        .unwrap();
    assert_eq!(label.float_property("x"), Some(0.0));
}

#[test]
fn render_and_flatten_produce_a_self_contained_document() {
    let state = processed_state();
    let config = Config::default();
    let tree = build_svg(
        &state,
        &config,
        &ShapeRegistry::default(),
        &LayerRegistry::default(),
        &[],
        &ExportMeta::default(),
    );

    let markup = tree.to_string();
    assert!(markup.contains("<svg"));
    assert!(markup.contains("<circle"));
    assert!(markup.contains("energy"));
    assert!(markup.contains("<image"));

    let flattened = flatten_document(&tree, config.render.canvas(), &fetcher());
    assert_eq!(flattened.attr("width"), Some("800"));
    assert_eq!(flattened.attr("height"), Some("700"));

    let mut images = Vec::new();
    flattened.descendants_named("image", &mut images);
    assert!(images.is_empty(), "embedded reference was not inlined");
    assert!(flattened.find_by_id("0-ns-grad1").is_some());
    assert!(flattened.to_string().contains("url(#0-ns-grad1)"));
}

#[test]
fn unknown_drag_target_fails_without_mutating() {
    let state = processed_state();
    assert!(drag_shape(state, "no such shape", 1.0, 1.0).is_err());
}
