use crate::config::{Config, ExportMeta};
use crate::dom::{Element, Node};
use crate::state::{DiagramState, Shape};
use crate::theme::Theme;
use log::error;
use std::collections::HashMap;
use time::{OffsetDateTime, format_description};

const TOOL_BANNER: &str =
    "This diagram was created with diagram-canvas (https://github.com/diagram-canvas/diagram-canvas)";

/// Screen coordinate transform of the host viewport, in SVG matrix order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl ScreenTransform {
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

pub struct RenderContext<'a> {
    pub canvas: [f64; 2],
    pub ctm: Option<ScreenTransform>,
    pub theme: &'a Theme,
}

/// Per-type drawing component. Implementations receive the shape and the
/// canvas context and return a subtree for the visual tree.
pub trait ShapeRenderer {
    fn render(&self, shape: &Shape, ctx: &RenderContext<'_>) -> Element;
}

/// Optional overlay renderer composed on top of the base shape rendering.
pub trait LayerRenderer {
    fn render(&self, shapes: &[Shape], state: &DiagramState, ctx: &RenderContext<'_>) -> Element;
}

#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub name: String,
    pub enabled: bool,
}

impl LayerSpec {
    pub fn enabled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
        }
    }
}

pub struct ShapeRegistry {
    renderers: HashMap<String, Box<dyn ShapeRenderer>>,
}

impl ShapeRegistry {
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: &str, renderer: Box<dyn ShapeRenderer>) {
        self.renderers.insert(kind.to_string(), renderer);
    }

    pub fn get(&self, kind: &str) -> Option<&dyn ShapeRenderer> {
        self.renderers.get(kind).map(|boxed| boxed.as_ref())
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        crate::shapes::register_defaults(&mut registry);
        registry
    }
}

pub struct LayerRegistry {
    renderers: HashMap<String, Box<dyn LayerRenderer>>,
}

impl LayerRegistry {
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, renderer: Box<dyn LayerRenderer>) {
        self.renderers.insert(name.to_string(), renderer);
    }

    pub fn get(&self, name: &str) -> Option<&dyn LayerRenderer> {
        self.renderers.get(name).map(|boxed| boxed.as_ref())
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("boundingBoxes", Box::new(crate::shapes::BoundingBoxLayer));
        registry
    }
}

/// Render one shape through the registry. An unknown type tag renders the
/// fixed placeholder and logs an error; the pipeline continues.
pub fn render_entity(shape: &Shape, registry: &ShapeRegistry, ctx: &RenderContext<'_>) -> Element {
    match registry.get(&shape.kind) {
        Some(renderer) => renderer.render(shape, ctx),
        None => {
            error!("could not render GPI {}", shape.kind);
            Element::new("rect")
                .set("fill", "red")
                .set("x", 0)
                .set("y", 0)
                .set("width", 100)
                .set("height", 100)
        }
    }
}

/// Render one overlay layer. Unregistered layers are skipped with an error;
/// an empty shape list renders as an empty group without one; a missing
/// screen transform renders empty with an error.
pub fn render_layer(
    spec: &LayerSpec,
    registry: &LayerRegistry,
    state: &DiagramState,
    ctx: &RenderContext<'_>,
) -> Option<Element> {
    let Some(renderer) = registry.get(&spec.name) else {
        error!("layer does not exist in deck: {}", spec.name);
        return None;
    };
    if !spec.enabled {
        return None;
    }
    if state.shapes.is_empty() {
        return Some(Element::new("g"));
    }
    if ctx.ctm.is_none() {
        error!("cannot get screen transform for layer {}", spec.name);
        return Some(Element::new("g"));
    }
    Some(renderer.render(&state.shapes, state, ctx))
}

/// Build the visual tree for a processed diagram state: the SVG root with
/// the descriptive header, every shape in order, then the enabled layers.
pub fn build_svg(
    state: &DiagramState,
    config: &Config,
    shapes: &ShapeRegistry,
    layers: &LayerRegistry,
    layer_specs: &[LayerSpec],
    meta: &ExportMeta,
) -> Element {
    let canvas = config.render.canvas();
    let ctx = RenderContext {
        canvas,
        ctm: Some(ScreenTransform::identity()),
        theme: &config.theme,
    };

    let mut root = Element::new("svg")
        .set("xmlns", "http://www.w3.org/2000/svg")
        .set("version", "1.2")
        .set("width", "100%")
        .set("height", "100%")
        .set("viewBox", format!("0 0 {} {}", canvas[0], canvas[1]));
    root.push(Node::Element(
        Element::new("desc").text(&desc_text(meta)),
    ));

    for shape in &state.shapes {
        root.push(Node::Element(render_entity(shape, shapes, &ctx)));
    }
    for spec in layer_specs {
        if let Some(layer) = render_layer(spec, layers, state, &ctx) {
            root.push(Node::Element(layer));
        }
    }
    root
}

fn desc_text(meta: &ExportMeta) -> String {
    let mut text = format!(
        "{TOOL_BANNER} on {}. If you have any suggestions on making this diagram more accessible, please contact us.\n",
        today_iso()
    );
    for channel in [&meta.substance, &meta.style, &meta.element] {
        if let Some(block) = channel {
            text.push_str(block);
            text.push('\n');
        }
    }
    if let Some(block) = &meta.other {
        text.push_str(block);
    }
    text
}

fn today_iso() -> String {
    let format = format_description::parse("[year]-[month]-[day]").expect("valid format");
    OffsetDateTime::now_utc()
        .date()
        .format(&format)
        .expect("valid format")
}

pub fn write_output_svg(svg: &str, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(
    svg: &str,
    output: &std::path::Path,
    render_cfg: &crate::config::RenderConfig,
) -> anyhow::Result<()> {
    let mut opt = usvg::Options::default();
    opt.default_size = usvg::Size::from_wh(render_cfg.width as f32, render_cfg.height as f32)
        .unwrap_or(usvg::Size::from_wh(800.0, 700.0).unwrap());

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}
