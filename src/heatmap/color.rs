use std::fmt;

use serde::{Deserialize, Serialize};

/// Editor color theme; only changes the lightness/saturation curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn from_dark(is_dark: bool) -> Self {
        if is_dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

/// An HSL color as CSS understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsl {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}

/// Observed `[oldest, newest]` author times within one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub min: i64,
    pub max: i64,
}

impl TimeRange {
    /// Range over the positive timestamps; `None` if there are none.
    pub fn from_times(times: impl IntoIterator<Item = i64>) -> Option<Self> {
        times
            .into_iter()
            .filter(|&t| t > 0)
            .fold(None, |range, t| match range {
                None => Some(TimeRange { min: t, max: t }),
                Some(r) => Some(TimeRange {
                    min: r.min.min(t),
                    max: r.max.max(t),
                }),
            })
    }

    /// Age ratio: 0 for the newest commit, 1 for the oldest.
    ///
    /// A file with a single distinct timestamp is all "newest".
    pub fn ratio(&self, time: i64) -> f64 {
        if self.max == self.min {
            return 0.0;
        }
        let ratio = (self.max - time) as f64 / (self.max - self.min) as f64;
        ratio.clamp(0.0, 1.0)
    }
}

/// Background color for a line of the given age ratio.
pub fn heat_color(ratio: f64, theme: Theme, hue: u16) -> Hsl {
    let saturation = (50.0 - ratio * 40.0).round();
    let lightness = match theme {
        Theme::Dark => (30.0 - ratio * 15.0).round(),
        Theme::Light => (85.0 + ratio * 11.0).round(),
    };
    Hsl {
        hue,
        saturation: saturation as u8,
        lightness: lightness as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_skips_unset() {
        assert_eq!(TimeRange::from_times([0, 0]), None);
        assert_eq!(
            TimeRange::from_times([0, 300, 100, 200]),
            Some(TimeRange { min: 100, max: 300 })
        );
    }

    #[test]
    fn test_ratio_bounds() {
        let range = TimeRange { min: 100, max: 300 };
        assert_eq!(range.ratio(300), 0.0);
        assert_eq!(range.ratio(100), 1.0);
        assert_eq!(range.ratio(200), 0.5);
    }

    #[test]
    fn test_ratio_single_timestamp() {
        let range = TimeRange { min: 500, max: 500 };
        assert_eq!(range.ratio(500), 0.0);
    }

    #[test]
    fn test_heat_color_dark() {
        assert_eq!(heat_color(0.0, Theme::Dark, 210).to_string(), "hsl(210, 50%, 30%)");
        assert_eq!(heat_color(1.0, Theme::Dark, 210).to_string(), "hsl(210, 10%, 15%)");
        assert_eq!(heat_color(0.5, Theme::Dark, 210).to_string(), "hsl(210, 30%, 23%)");
    }

    #[test]
    fn test_heat_color_light() {
        assert_eq!(heat_color(0.0, Theme::Light, 210).to_string(), "hsl(210, 50%, 85%)");
        assert_eq!(heat_color(1.0, Theme::Light, 210).to_string(), "hsl(210, 10%, 96%)");
    }

    #[test]
    fn test_theme_from_dark() {
        assert_eq!(Theme::from_dark(true), Theme::Dark);
        assert_eq!(Theme::from_dark(false), Theme::Light);
    }
}
