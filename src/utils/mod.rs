//! Buffer-level primitives used by the pipeline stages

pub mod composite;
pub mod filters;
pub mod morphology;
pub mod preprocessing;
pub mod resize;

pub use composite::{alpha_channel, alpha_composite, fill_with_mask, paste_with_mask, subtract, with_alpha};
pub use filters::{gaussian_blur_5x5, gaussian_blur_rgba, threshold};
pub use morphology::{close, dilate, erode};
pub use preprocessing::ImagePreprocessor;
pub use resize::{resize_bilinear, resize_nearest};
