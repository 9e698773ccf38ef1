use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            RGBColor(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: series label → RGBColor
// ---------------------------------------------------------------------------

const DEFAULT_COLOR: RGBColor = RGBColor(128, 128, 128);

/// Maps chart labels (compounds, samples) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, RGBColor>,
}

impl ColorMap {
    /// One colour per label; duplicate labels share the first colour.
    pub fn new(labels: &[String]) -> Self {
        let mut mapping = BTreeMap::new();
        for (label, color) in labels.iter().zip(generate_palette(labels.len())) {
            mapping.entry(label.clone()).or_insert(color);
        }
        ColorMap { mapping }
    }

    /// Colour for `label`; grey when the label is unknown.
    pub fn color_for(&self, label: &str) -> RGBColor {
        self.mapping.get(label).copied().unwrap_or(DEFAULT_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size_and_distinct_colours() {
        let palette = generate_palette(6);
        assert_eq!(palette.len(), 6);
        for (i, a) in palette.iter().enumerate() {
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_labels_are_grey() {
        let labels = vec!["BDE_47".to_string(), "BDE_99".to_string()];
        let map = ColorMap::new(&labels);
        assert_ne!(map.color_for("BDE_47"), map.color_for("BDE_99"));
        assert_eq!(map.color_for("PCB_153"), DEFAULT_COLOR);
    }
}
