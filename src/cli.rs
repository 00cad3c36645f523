use crate::config::{ExportMeta, load_config};
use crate::export::{DEFAULT_TITLE, download_svg, prepare_svg_content, print_document};
use crate::interact::drag_shape;
use crate::pipeline::{PipelineServices, process_state};
use crate::render::{LayerRegistry, LayerSpec, ShapeRegistry, build_svg, write_output_svg};
use crate::resources::HttpFetcher;
use crate::state::DiagramState;
use crate::text_metrics::{FixedMeasurer, FontMeasurer, LabelMeasurer};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "dcv", version, about = "Solver-driven diagram canvas: render, interact, export")]
pub struct Args {
    /// Diagram state JSON (from the solver) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme variables, canvas size)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Keep external references instead of inlining them
    #[arg(long = "raw")]
    pub raw: bool,

    /// Enable an overlay layer by name (repeatable)
    #[arg(long = "layer")]
    pub layers: Vec<String>,

    /// Apply one drag delta before rendering, as NAME:DX,DY
    #[arg(long = "drag")]
    pub drag: Option<String>,

    /// Substance metadata file embedded in the output header
    #[arg(long = "substanceMetadata")]
    pub substance_metadata: Option<PathBuf>,

    /// Style metadata file embedded in the output header
    #[arg(long = "styleMetadata")]
    pub style_metadata: Option<PathBuf>,

    /// Element metadata file embedded in the output header
    #[arg(long = "elementMetadata")]
    pub element_metadata: Option<PathBuf>,

    /// Additional metadata file embedded in the output header
    #[arg(long = "otherMetadata")]
    pub other_metadata: Option<PathBuf>,

    /// Use deterministic character-grid label metrics instead of system fonts
    #[arg(long = "charMetrics")]
    pub char_metrics: bool,

    /// Also write the flattened document into this directory as <title>.svg
    #[arg(long = "downloadDir")]
    pub download_dir: Option<PathBuf>,

    /// Base name for the downloaded document
    #[arg(long = "title", default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Send the flattened document to the host print spooler
    #[arg(long = "print")]
    pub print: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    #[cfg(feature = "png")]
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let mut state = DiagramState::from_json(&input)?;

    let fetcher = HttpFetcher::new();
    let font_measurer = FontMeasurer;
    let char_measurer = FixedMeasurer::default();
    let measurer: &dyn LabelMeasurer = if args.char_metrics {
        &char_measurer
    } else {
        &font_measurer
    };
    let services = PipelineServices {
        measurer,
        fetcher: &fetcher,
    };

    state = process_state(state, &services, &config.theme);
    if let Some(spec) = args.drag.as_deref() {
        let (name, dx, dy) = parse_drag(spec)?;
        state = drag_shape(state, &name, dx, dy)?;
    }

    let meta = ExportMeta {
        substance: read_metadata(args.substance_metadata.as_deref())?,
        style: read_metadata(args.style_metadata.as_deref())?,
        element: read_metadata(args.element_metadata.as_deref())?,
        other: read_metadata(args.other_metadata.as_deref())?,
    };
    let layer_specs: Vec<LayerSpec> = args
        .layers
        .iter()
        .map(|name| LayerSpec::enabled(name))
        .collect();

    let tree = build_svg(
        &state,
        &config,
        &ShapeRegistry::default(),
        &LayerRegistry::default(),
        &layer_specs,
        &meta,
    );

    let svg = if args.raw {
        tree.to_string()
    } else {
        prepare_svg_content(&tree, config.render.canvas(), &fetcher)
    };

    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        #[cfg(feature = "png")]
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            crate::render::write_output_png(&svg, &output, &config.render)?;
        }
    }

    if let Some(dir) = &args.download_dir {
        download_svg(&svg, dir, &args.title)?;
    }
    if args.print {
        print_document(&svg)?;
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_metadata(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
        None => Ok(None),
    }
}

#[cfg(feature = "png")]
fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

fn parse_drag(spec: &str) -> Result<(String, f64, f64)> {
    let (name, deltas) = spec
        .rsplit_once(':')
        .ok_or_else(|| anyhow::anyhow!("drag spec must be NAME:DX,DY"))?;
    let (dx, dy) = deltas
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("drag spec must be NAME:DX,DY"))?;
    Ok((name.to_string(), dx.trim().parse()?, dy.trim().parse()?))
}
