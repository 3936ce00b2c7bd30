//! Per-slot light themes keyed on formation names
//!
//! Purely cosmetic: the cue attached to a projected drone never affects its
//! position.

use rand::Rng;
use show_core::LightEffect;

/// Color, brightness and animation for one drone light
#[derive(Debug, Clone, PartialEq)]
pub struct LightCue {
    /// CSS `hsl(...)` color string
    pub color: String,
    pub intensity: f64,
    pub effect: LightEffect,
}

/// Palette chosen from a formation name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightTheme {
    /// Star: yellow to orange, hue 30-90
    Warm,
    /// Triangle: blue to purple, hue 200-280
    Cool,
    /// Circle: full hue spectrum across the slots
    Spectrum,
    /// Anything else: random hue per drone
    Random,
}

impl LightTheme {
    /// Case-sensitive substring match, first match wins
    pub fn for_formation(name: &str) -> Self {
        if name.contains("Star") {
            Self::Warm
        } else if name.contains("Triangle") {
            Self::Cool
        } else if name.contains("Circle") {
            Self::Spectrum
        } else {
            Self::Random
        }
    }

    /// Cue for slot `index` of `total`
    pub fn cue<R: Rng + ?Sized>(&self, index: usize, total: usize, rng: &mut R) -> LightCue {
        match self {
            LightTheme::Warm => {
                let hue = 30 + (index % 5) * 15;
                LightCue {
                    color: format!("hsl({hue}, 100%, 60%)"),
                    intensity: 2.5,
                    effect: if index % 3 == 0 { LightEffect::Pulse } else { LightEffect::Steady },
                }
            }
            LightTheme::Cool => {
                let hue = 200 + (index % 3) * 40;
                LightCue {
                    color: format!("hsl({hue}, 80%, 65%)"),
                    intensity: 2.0,
                    effect: LightEffect::Fade,
                }
            }
            LightTheme::Spectrum => {
                let hue = index as f64 / total.max(1) as f64 * 360.0;
                LightCue {
                    color: format!("hsl({hue}, 90%, 60%)"),
                    intensity: 1.8,
                    effect: if index % 4 == 0 { LightEffect::Strobe } else { LightEffect::Steady },
                }
            }
            LightTheme::Random => {
                let hue: f64 = rng.gen_range(0.0..360.0);
                LightCue {
                    color: format!("hsl({hue}, 85%, 65%)"),
                    intensity: 2.0,
                    effect: LightEffect::Steady,
                }
            }
        }
    }
}
