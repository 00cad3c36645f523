use crate::dom::Element;
use crate::resolve::propagate_update;
use crate::resources::Fetcher;
use crate::state::{DiagramState, Shape, Value, find_shape};
use crate::text_metrics::LabelMeasurer;
use crate::theme::Theme;
use log::error;

/// Host services the pipeline suspends on. Both are blocking calls into the
/// host; every stage waits for the previous stage's calls to complete.
pub struct PipelineServices<'a> {
    pub measurer: &'a dyn LabelMeasurer,
    pub fetcher: &'a dyn Fetcher,
}

/// Transform raw solver output into a render-ready state: measure labels,
/// prefetch images, order, filter, then resolve all pending property paths.
/// The stages run strictly in this order.
pub fn process_state(
    mut state: DiagramState,
    services: &PipelineServices<'_>,
    theme: &Theme,
) -> DiagramState {
    collect_labels(&mut state.shapes, services.measurer, theme);
    load_images(&mut state.shapes, services.fetcher);
    state.shapes = sort_shapes(state.shapes, &state.shape_ordering);
    state.shapes.retain(not_empty_label);
    propagate_update(state)
}

/// Annotate every text shape with measured bounding extents.
pub fn collect_labels(shapes: &mut [Shape], measurer: &dyn LabelMeasurer, theme: &Theme) {
    for shape in shapes.iter_mut().filter(|shape| shape.kind == "Text") {
        let Some(text) = shape.str_property("string").map(str::to_string) else {
            continue;
        };
        let font_size = shape.float_property("fontSize").unwrap_or(theme.font_size);
        let family = shape
            .str_property("fontFamily")
            .unwrap_or(&theme.font_family)
            .to_string();
        match measurer.measure(&text, font_size, &family) {
            Some(extents) => {
                shape.set("w", Value::Float(extents.width));
                shape.set("h", Value::Float(extents.height));
            }
            None => error!("could not measure label {:?} for {}", text, shape.name),
        }
    }
}

/// Ensure every image shape's referenced media is loaded, and annotate
/// intrinsic extents when the shape does not pin its own.
pub fn load_images(shapes: &mut [Shape], fetcher: &dyn Fetcher) {
    for shape in shapes.iter_mut().filter(|shape| shape.kind == "Image") {
        let Some(href) = shape.str_property("path").map(str::to_string) else {
            error!("image shape {} has no path", shape.name);
            continue;
        };
        let document = match fetcher.fetch(&href) {
            Ok(document) => document,
            Err(e) => {
                error!("could not prefetch {href}: {e}");
                continue;
            }
        };
        let root = match Element::parse(&document) {
            Ok(root) => root,
            Err(e) => {
                error!("prefetched {href} is not a vector document: {e}");
                continue;
            }
        };
        for (property, attr) in [("w", "width"), ("h", "height")] {
            let pinned = shape
                .property(property)
                .is_some_and(|cell| !cell.is_pending());
            if pinned {
                continue;
            }
            if let Some(length) = root.attr(attr).and_then(parse_length) {
                shape.set(property, Value::Float(length));
            }
        }
    }
}

/// Reorder shapes by the externally supplied name ordering. An ordering
/// entry naming no shape produces nothing for that slot; shapes absent from
/// the ordering are dropped. Assumes one shape per name.
pub fn sort_shapes(shapes: Vec<Shape>, ordering: &[String]) -> Vec<Shape> {
    ordering
        .iter()
        .filter_map(|name| find_shape(&shapes, name).cloned())
        .collect()
}

/// Keep everything except text shapes whose string content is empty.
pub fn not_empty_label(shape: &Shape) -> bool {
    if shape.kind != "Text" {
        return true;
    }
    shape.str_property("string") != Some("")
}

fn parse_length(raw: &str) -> Option<f64> {
    raw.trim().trim_end_matches("px").parse().ok()
}
