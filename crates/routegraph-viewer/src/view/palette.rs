use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse_hex(text: &str) -> Result<Self, String> {
        let hex = text
            .strip_prefix('#')
            .ok_or_else(|| format!("color {text:?} must start with '#'"))?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("color {text:?} must be #rrggbb"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| format!("color {text:?} must be #rrggbb"))
        };
        Ok(Self { r: channel(0..2)?, g: channel(2..4)?, b: channel(4..6)? })
    }

    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.hex()
    }
}

// How a per-node metric ratio in [0, 1] maps to a color. Which scale a dataset
// uses is configuration, not code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorScale {
    Anchors {
        stops: Vec<Rgb>,
    },
    HueRotation {
        start_deg: f64,
        span_deg: f64,
        saturation: f64,
        lightness: f64,
    },
}

impl ColorScale {
    // Blue over cyan and green to red, the cold-to-hot reading of a metric.
    pub fn heatmap() -> Self {
        Self::Anchors {
            stops: vec![
                Rgb::new(59, 130, 246),
                Rgb::new(6, 182, 212),
                Rgb::new(34, 197, 94),
                Rgb::new(234, 179, 8),
                Rgb::new(239, 68, 68),
            ],
        }
    }

    pub fn hue_sweep() -> Self {
        Self::HueRotation { start_deg: 240.0, span_deg: -240.0, saturation: 0.8, lightness: 0.55 }
    }

    pub fn interpolate(&self, ratio: f64) -> Rgb {
        let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
        match self {
            Self::Anchors { stops } => {
                if stops.is_empty() {
                    return Rgb::new(0, 0, 0);
                }
                let last = stops.len() - 1;
                let scaled = ratio * last as f64;
                let ix = (scaled.floor() as usize).min(last);
                let t = scaled - ix as f64;
                let lo = stops[ix];
                let hi = stops[(ix + 1).min(last)];
                let lerp = |a: u8, b: u8| (a as f64 + t * (b as f64 - a as f64)).floor() as u8;
                Rgb::new(lerp(lo.r, hi.r), lerp(lo.g, hi.g), lerp(lo.b, hi.b))
            }
            Self::HueRotation { start_deg, span_deg, saturation, lightness } => {
                hsl_to_rgb(start_deg + ratio * span_deg, *saturation, *lightness)
            }
        }
    }
}

// value == min maps to 0.0; a flat metric collapses the whole range onto 0.0.
pub fn ratio_for(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        0.0
    } else {
        (value - min) / (max - min)
    }
}

fn hsl_to_rgb(hue_deg: f64, saturation: f64, lightness: f64) -> Rgb {
    let hue = hue_deg.rem_euclid(360.0);
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation.clamp(0.0, 1.0);
    let hp = hue / 60.0;
    let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness.clamp(0.0, 1.0) - c / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(r1), channel(g1), channel(b1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing_round_trips() {
        let blue = Rgb::parse_hex("#3b82f6").expect("parse");
        assert_eq!(blue, Rgb::new(59, 130, 246));
        assert_eq!(blue.hex(), "#3b82f6");
    }

    #[test]
    fn hex_parsing_rejects_malformed_input() {
        assert!(Rgb::parse_hex("3b82f6").is_err());
        assert!(Rgb::parse_hex("#3b82").is_err());
        assert!(Rgb::parse_hex("#gggggg").is_err());
    }

    #[test]
    fn anchor_scale_hits_exact_stops_at_the_ends() {
        let scale = ColorScale::heatmap();
        assert_eq!(scale.interpolate(0.0), Rgb::new(59, 130, 246));
        assert_eq!(scale.interpolate(1.0), Rgb::new(239, 68, 68));
    }

    #[test]
    fn anchor_scale_midpoint_lands_on_the_middle_stop() {
        // Five stops: ratio 0.5 scales to exactly index 2.
        let scale = ColorScale::heatmap();
        assert_eq!(scale.interpolate(0.5), Rgb::new(34, 197, 94));
    }

    #[test]
    fn anchor_scale_floors_blended_channels() {
        // ratio 0.125 sits halfway between the first two stops.
        let scale = ColorScale::heatmap();
        assert_eq!(scale.interpolate(0.125), Rgb::new(32, 156, 229));
    }

    #[test]
    fn out_of_range_ratios_clamp_to_the_ends() {
        let scale = ColorScale::heatmap();
        assert_eq!(scale.interpolate(-0.5), scale.interpolate(0.0));
        assert_eq!(scale.interpolate(7.0), scale.interpolate(1.0));
        assert_eq!(scale.interpolate(f64::NAN), scale.interpolate(0.0));
    }

    #[test]
    fn hue_rotation_covers_primary_hues() {
        let scale = ColorScale::HueRotation {
            start_deg: 0.0,
            span_deg: 120.0,
            saturation: 1.0,
            lightness: 0.5,
        };
        assert_eq!(scale.interpolate(0.0), Rgb::new(255, 0, 0));
        assert_eq!(scale.interpolate(1.0), Rgb::new(0, 255, 0));
    }

    #[test]
    fn ratio_for_spreads_values_over_the_range() {
        assert_eq!(ratio_for(0.0, 0.0, 4.0), 0.0);
        assert_eq!(ratio_for(1.0, 0.0, 4.0), 0.25);
        assert_eq!(ratio_for(4.0, 0.0, 4.0), 1.0);
    }

    #[test]
    fn flat_metric_collapses_to_zero() {
        assert_eq!(ratio_for(3.0, 3.0, 3.0), 0.0);
    }
}
