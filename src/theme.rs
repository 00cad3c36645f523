use serde::{Deserialize, Serialize};

/// Default styling applied when a shape carries no explicit property for a
/// visual attribute. Shape properties always win over the theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f64,
    pub background: String,
    pub fill: String,
    pub stroke: String,
    pub text_color: String,
}

impl Theme {
    pub fn canvas_default() -> Self {
        Self {
            font_family: "Helvetica, Arial, sans-serif".to_string(),
            font_size: 16.0,
            background: "#FFFFFF".to_string(),
            fill: "#C9C9C9".to_string(),
            stroke: "#000000".to_string(),
            text_color: "#000000".to_string(),
        }
    }

    pub fn monochrome() -> Self {
        Self {
            font_family: "Helvetica, Arial, sans-serif".to_string(),
            font_size: 16.0,
            background: "#FFFFFF".to_string(),
            fill: "#FFFFFF".to_string(),
            stroke: "#222222".to_string(),
            text_color: "#222222".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::canvas_default()
    }
}
