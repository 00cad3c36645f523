use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed intrinsic canvas dimensions of the output document.
pub const DEFAULT_CANVAS: [f64; 2] = [800.0, 700.0];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS[0],
            height: DEFAULT_CANVAS[1],
        }
    }
}

impl RenderConfig {
    pub fn canvas(&self) -> [f64; 2] {
        [self.width, self.height]
    }
}

/// Free-text metadata channels embedded in the output document's header, in
/// this fixed order.
#[derive(Debug, Clone, Default)]
pub struct ExportMeta {
    pub substance: Option<String>,
    pub style: Option<String>,
    pub element: Option<String>,
    pub other: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub render: RenderConfig,
    pub theme: Theme,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeOverrides {
    font_family: Option<String>,
    font_size: Option<f64>,
    background: Option<String>,
    fill: Option<String>,
    stroke: Option<String>,
    text_color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasOverrides {
    width: Option<f64>,
    height: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeOverrides>,
    canvas: Option<CanvasOverrides>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "monochrome" {
            config.theme = Theme::monochrome();
        } else if theme_name == "default" || theme_name == "canvas" {
            config.theme = Theme::canvas_default();
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.fill {
            config.theme.fill = v;
        }
        if let Some(v) = vars.stroke {
            config.theme.stroke = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
    }

    if let Some(canvas) = parsed.canvas {
        if let Some(v) = canvas.width {
            config.render.width = v;
        }
        if let Some(v) = canvas.height {
            config.render.height = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_canvas_is_fixed_800_by_700() {
        let config = Config::default();
        assert_eq!(config.render.canvas(), [800.0, 700.0]);
    }

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.theme.font_size, 16.0);
    }
}
