//! # Show Patterns
//!
//! Formation geometry for drone shows:
//! - Star, triangle and circle generators
//! - Positional interpolation between formations
//! - Eased animation of a fleet onto a formation
//! - JSON export of formations and timed show patterns

pub mod export;
pub mod generator;
pub mod interpolate;
pub mod pattern;

pub use generator::{
    DEFAULT_STAR_POINTS, PatternParams, PatternType, create_circle, create_star, create_triangle,
    demo_sequence, generate,
};
pub use interpolate::{animate_towards, ease_in_out, interpolate, interpolation_sequence};
pub use pattern::{ShowPattern, ShowPatternType, TimedPosition};
