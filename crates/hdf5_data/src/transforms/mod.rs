pub mod core;
pub mod data_transformer;
pub mod rng;
pub mod vision;

pub use core::{Chain, Identity, Transform};
pub use data_transformer::{DataTransformer, ImageTransformer};
pub use rng::TransformRng;
