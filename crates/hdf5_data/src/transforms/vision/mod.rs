//! src/transforms/vision/mod.rs
//!
//! Image transforms applied to decoded RGB samples before they are written
//! into an output blob.
//!
//! ```text
//! transforms/vision/
//! ├── geometric.rs     → Crops (center, random)
//! └── augmentation.rs  → Pure data augmentation (flip)
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use crate::transforms::Transform;
//! use crate::transforms::vision::{RandomCrop, RandomHorizontalFlip};
//! use crate::transforms::TransformRng;
//!
//! let rng = TransformRng::seeded(7);
//! let pipeline = RandomCrop::new(227, rng.clone())?.then(RandomHorizontalFlip::new(0.5, rng)?);
//! ```

pub mod augmentation;
pub mod geometric;

pub use augmentation::RandomHorizontalFlip;
pub use geometric::{CenterCrop, RandomCrop};
