use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Measured bounding extents of one label string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelExtents {
    pub width: f64,
    pub height: f64,
}

/// Host label-measurement service. Returns `None` when no usable font can be
/// resolved for the requested family.
pub trait LabelMeasurer {
    fn measure(&self, text: &str, font_size: f64, font_family: &str) -> Option<LabelExtents>;
}

/// Measures against the system font database.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontMeasurer;

impl LabelMeasurer for FontMeasurer {
    fn measure(&self, text: &str, font_size: f64, font_family: &str) -> Option<LabelExtents> {
        measure_label(text, font_size, font_family)
    }
}

/// Deterministic character-grid measurer for tests, benches, and offline
/// runs: every glyph advances `char_ratio * font_size`.
#[derive(Debug, Clone, Copy)]
pub struct FixedMeasurer {
    pub char_ratio: f64,
    pub line_ratio: f64,
}

impl Default for FixedMeasurer {
    fn default() -> Self {
        Self {
            char_ratio: 0.6,
            line_ratio: 1.2,
        }
    }
}

impl LabelMeasurer for FixedMeasurer {
    fn measure(&self, text: &str, font_size: f64, _font_family: &str) -> Option<LabelExtents> {
        let lines: Vec<&str> = text.split('\n').collect();
        let widest = lines.iter().map(|line| line.chars().count()).max()?;
        Some(LabelExtents {
            width: widest as f64 * self.char_ratio * font_size,
            height: lines.len() as f64 * self.line_ratio * font_size,
        })
    }
}

static MEASURER: Lazy<Mutex<MeasurerState>> = Lazy::new(|| Mutex::new(MeasurerState::new()));

pub fn measure_label(text: &str, font_size: f64, font_family: &str) -> Option<LabelExtents> {
    if font_size <= 0.0 {
        return None;
    }
    if text.is_empty() {
        return Some(LabelExtents {
            width: 0.0,
            height: 0.0,
        });
    }
    let mut guard = MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

struct MeasurerState {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<LoadedFace>>,
}

impl MeasurerState {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f64, font_family: &str) -> Option<LabelExtents> {
        let key = family_key(font_family);
        if !self.faces.contains_key(&key) {
            let loaded = self.load_face(font_family);
            self.faces.insert(key.clone(), loaded);
        }
        let face = self.faces.get_mut(&key)?.as_mut()?;
        face.measure(text, font_size)
    }

    fn load_face(&mut self, font_family: &str) -> Option<LoadedFace> {
        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" => Family::SansSerif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let mut loaded: Option<LoadedFace> = None;
        self.db.with_face_data(id, |data, index| {
            loaded = LoadedFace::parse(data.to_vec(), index);
        });
        loaded
    }
}

struct LoadedFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    line_units: i32,
    advance_cache: HashMap<char, Option<u16>>,
}

impl LoadedFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let line_units = face.ascender() as i32 - face.descender() as i32;
        Some(Self {
            data,
            index,
            units_per_em,
            line_units,
            advance_cache: HashMap::new(),
        })
    }

    fn measure(&mut self, text: &str, font_size: f64) -> Option<LabelExtents> {
        let face = Face::parse(&self.data, self.index).ok()?;
        let scale = font_size / self.units_per_em as f64;
        let fallback = font_size * 0.56;

        let mut widest = 0.0f64;
        for line in text.split('\n') {
            let mut width = 0.0f64;
            for ch in line.chars() {
                let advance = match self.advance_cache.get(&ch) {
                    Some(cached) => *cached,
                    None => {
                        let advance = face
                            .glyph_index(ch)
                            .and_then(|id| face.glyph_hor_advance(id));
                        self.advance_cache.insert(ch, advance);
                        advance
                    }
                };
                match advance {
                    Some(units) => width += units as f64 * scale,
                    None => width += fallback,
                }
            }
            widest = widest.max(width);
        }

        let lines = text.split('\n').count().max(1);
        Some(LabelExtents {
            width: widest,
            height: lines as f64 * self.line_units as f64 * scale,
        })
    }
}

fn family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}
