use crate::dom::Element;
use crate::render::{LayerRenderer, RenderContext, ShapeRegistry, ShapeRenderer};
use crate::state::{DiagramState, Shape, Value};

/// Map the diagram's center-origin coordinates to top-left screen space.
pub fn to_screen(point: [f64; 2], canvas: [f64; 2]) -> [f64; 2] {
    [canvas[0] / 2.0 + point[0], canvas[1] / 2.0 - point[1]]
}

pub fn register_defaults(registry: &mut ShapeRegistry) {
    registry.register("Circle", Box::new(Circle));
    registry.register("Square", Box::new(Square));
    registry.register("Rectangle", Box::new(Rectangle));
    registry.register("Text", Box::new(Label));
    registry.register("Line", Box::new(Line));
    registry.register("Arrow", Box::new(Arrow));
    registry.register("Curve", Box::new(Curve));
    registry.register("Image", Box::new(Image));
}

fn fmt(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value}")
    } else {
        format!("{value:.2}")
    }
}

fn float(shape: &Shape, name: &str, default: f64) -> f64 {
    shape.float_property(name).unwrap_or(default)
}

fn screen_pos(shape: &Shape, ctx: &RenderContext<'_>) -> [f64; 2] {
    to_screen(
        [float(shape, "x", 0.0), float(shape, "y", 0.0)],
        ctx.canvas,
    )
}

fn css_color(shape: &Shape, property: &str, default: &str) -> String {
    match shape.property(property).map(|cell| cell.value()) {
        Some(Value::Color([r, g, b, a])) => format!(
            "rgba({},{},{},{})",
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
            a
        ),
        Some(Value::Str(s)) => s.clone(),
        _ => default.to_string(),
    }
}

struct Circle;

impl ShapeRenderer for Circle {
    fn render(&self, shape: &Shape, ctx: &RenderContext<'_>) -> Element {
        let [cx, cy] = screen_pos(shape, ctx);
        Element::new("circle")
            .set("cx", fmt(cx))
            .set("cy", fmt(cy))
            .set("r", fmt(float(shape, "r", 0.0)))
            .set("fill", css_color(shape, "color", &ctx.theme.fill))
            .set("stroke", css_color(shape, "strokeColor", "none"))
            .set("stroke-width", fmt(float(shape, "strokeWidth", 0.0)))
    }
}

struct Square;

impl ShapeRenderer for Square {
    fn render(&self, shape: &Shape, ctx: &RenderContext<'_>) -> Element {
        let [cx, cy] = screen_pos(shape, ctx);
        let side = float(shape, "side", 0.0);
        Element::new("rect")
            .set("x", fmt(cx - side / 2.0))
            .set("y", fmt(cy - side / 2.0))
            .set("width", fmt(side))
            .set("height", fmt(side))
            .set("fill", css_color(shape, "color", &ctx.theme.fill))
            .set("stroke", css_color(shape, "strokeColor", "none"))
            .set("stroke-width", fmt(float(shape, "strokeWidth", 0.0)))
    }
}

struct Rectangle;

impl ShapeRenderer for Rectangle {
    fn render(&self, shape: &Shape, ctx: &RenderContext<'_>) -> Element {
        let [cx, cy] = screen_pos(shape, ctx);
        let w = float(shape, "w", 0.0);
        let h = float(shape, "h", 0.0);
        Element::new("rect")
            .set("x", fmt(cx - w / 2.0))
            .set("y", fmt(cy - h / 2.0))
            .set("width", fmt(w))
            .set("height", fmt(h))
            .set("fill", css_color(shape, "color", &ctx.theme.fill))
            .set("stroke", css_color(shape, "strokeColor", "none"))
            .set("stroke-width", fmt(float(shape, "strokeWidth", 0.0)))
    }
}

struct Label;

impl ShapeRenderer for Label {
    fn render(&self, shape: &Shape, ctx: &RenderContext<'_>) -> Element {
        let [x, y] = screen_pos(shape, ctx);
        Element::new("text")
            .set("x", fmt(x))
            .set("y", fmt(y))
            .set("text-anchor", "middle")
            .set("dominant-baseline", "middle")
            .set(
                "font-family",
                shape
                    .str_property("fontFamily")
                    .unwrap_or(&ctx.theme.font_family),
            )
            .set(
                "font-size",
                fmt(float(shape, "fontSize", ctx.theme.font_size)),
            )
            .set("fill", css_color(shape, "color", &ctx.theme.text_color))
            .text(shape.str_property("string").unwrap_or_default())
    }
}

struct Line;

impl ShapeRenderer for Line {
    fn render(&self, shape: &Shape, ctx: &RenderContext<'_>) -> Element {
        let [x1, y1] = to_screen(
            [float(shape, "startX", 0.0), float(shape, "startY", 0.0)],
            ctx.canvas,
        );
        let [x2, y2] = to_screen(
            [float(shape, "endX", 0.0), float(shape, "endY", 0.0)],
            ctx.canvas,
        );
        Element::new("line")
            .set("x1", fmt(x1))
            .set("y1", fmt(y1))
            .set("x2", fmt(x2))
            .set("y2", fmt(y2))
            .set("stroke", css_color(shape, "color", &ctx.theme.stroke))
            .set("stroke-width", fmt(float(shape, "thickness", 1.0)))
    }
}

struct Arrow;

impl ShapeRenderer for Arrow {
    fn render(&self, shape: &Shape, ctx: &RenderContext<'_>) -> Element {
        let [x1, y1] = to_screen(
            [float(shape, "startX", 0.0), float(shape, "startY", 0.0)],
            ctx.canvas,
        );
        let [x2, y2] = to_screen(
            [float(shape, "endX", 0.0), float(shape, "endY", 0.0)],
            ctx.canvas,
        );
        let marker_id = format!("arrowhead-{}", shape.name.replace(' ', "-"));
        let stroke = css_color(shape, "color", &ctx.theme.stroke);

        let marker = Element::new("marker")
            .set("id", &marker_id)
            .set("markerWidth", 10)
            .set("markerHeight", 10)
            .set("refX", 9)
            .set("refY", 3)
            .set("orient", "auto")
            .set("markerUnits", "strokeWidth")
            .add(Element::new("path").set("d", "M0,0 L9,3 L0,6").set("fill", &stroke));

        Element::new("g")
            .add(Element::new("defs").add(marker))
            .add(
                Element::new("line")
                    .set("x1", fmt(x1))
                    .set("y1", fmt(y1))
                    .set("x2", fmt(x2))
                    .set("y2", fmt(y2))
                    .set("stroke", stroke)
                    .set("stroke-width", fmt(float(shape, "thickness", 1.0)))
                    .set("marker-end", format!("url(#{marker_id})")),
            )
    }
}

struct Curve;

impl ShapeRenderer for Curve {
    fn render(&self, shape: &Shape, ctx: &RenderContext<'_>) -> Element {
        let points = match shape.property("points").map(|cell| cell.value()) {
            Some(Value::PtList(points)) => points.clone(),
            _ => Vec::new(),
        };
        let mut d = String::new();
        for (index, point) in points.iter().enumerate() {
            let [x, y] = to_screen(*point, ctx.canvas);
            if index == 0 {
                d.push_str(&format!("M {} {}", fmt(x), fmt(y)));
            } else {
                d.push_str(&format!(" L {} {}", fmt(x), fmt(y)));
            }
        }
        Element::new("path")
            .set("d", d)
            .set("fill", "none")
            .set("stroke", css_color(shape, "color", &ctx.theme.stroke))
            .set("stroke-width", fmt(float(shape, "thickness", 1.0)))
    }
}

struct Image;

impl ShapeRenderer for Image {
    fn render(&self, shape: &Shape, ctx: &RenderContext<'_>) -> Element {
        let [cx, cy] = screen_pos(shape, ctx);
        let w = float(shape, "w", 0.0);
        let h = float(shape, "h", 0.0);
        Element::new("image")
            .set("x", fmt(cx - w / 2.0))
            .set("y", fmt(cy - h / 2.0))
            .set("width", fmt(w))
            .set("height", fmt(h))
            .set("href", shape.str_property("path").unwrap_or_default())
    }
}

/// Debug overlay: dashed outline around every shape's approximate extents.
pub struct BoundingBoxLayer;

impl LayerRenderer for BoundingBoxLayer {
    fn render(&self, shapes: &[Shape], _state: &DiagramState, ctx: &RenderContext<'_>) -> Element {
        let mut group = Element::new("g");
        for shape in shapes {
            let Some((w, h)) = extents(shape) else {
                continue;
            };
            let [cx, cy] = screen_pos(shape, ctx);
            group = group.add(
                Element::new("rect")
                    .set("x", fmt(cx - w / 2.0))
                    .set("y", fmt(cy - h / 2.0))
                    .set("width", fmt(w))
                    .set("height", fmt(h))
                    .set("fill", "none")
                    .set("stroke", "#FF4D00")
                    .set("stroke-dasharray", "4 2"),
            );
        }
        group
    }
}

fn extents(shape: &Shape) -> Option<(f64, f64)> {
    if let Some(r) = shape.float_property("r") {
        return Some((r * 2.0, r * 2.0));
    }
    if let Some(side) = shape.float_property("side") {
        return Some((side, side));
    }
    match (shape.float_property("w"), shape.float_property("h")) {
        (Some(w), Some(h)) => Some((w, h)),
        _ => None,
    }
}
