pub mod perceptual;

pub use perceptual::{Comparison, HashField, HashSettings, PerceptualHash, PerceptualService};
