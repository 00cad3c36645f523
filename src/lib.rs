#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dom;
pub mod error;
pub mod export;
pub mod interact;
pub mod pipeline;
pub mod render;
pub mod resolve;
pub mod resources;
pub mod shapes;
pub mod state;
pub mod text_metrics;
pub mod theme;
pub mod varying;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, ExportMeta, RenderConfig};
pub use error::CanvasError;
pub use export::{flatten_document, prepare_svg_content};
pub use interact::drag_shape;
pub use pipeline::{PipelineServices, process_state};
pub use render::{LayerRegistry, LayerSpec, ShapeRegistry, build_svg};
pub use resolve::propagate_update;
pub use state::DiagramState;
pub use theme::Theme;
pub use varying::sync_varying_state;
