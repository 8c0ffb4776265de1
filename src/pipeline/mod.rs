pub mod geo;
pub mod normalize;
pub mod parse;
pub mod power_curve;
