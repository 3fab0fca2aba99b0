#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A 3D involution layer for Burn.
//!
//! Involution inverts the design of convolution: instead of sharing one trainable kernel across
//! every spatial location, the kernel applied at each voxel is generated from the input at that
//! voxel, and shared across the channels of a group.
//!
//! All tensors use the channels-last layout `[batch, depth, height, width, channels]`.
//!
//! ```rust,ignore
//! use burn_involution::{InvolutionConfig, InvolutionPadding};
//!
//! let layer = InvolutionConfig::new(16)
//!     .with_kernel_size([3, 3, 3])
//!     .with_padding(InvolutionPadding::Symmetric)
//!     .init::<B>(16, &device);
//!
//! let output = layer.forward(input); // [1, 8, 8, 8, 16] -> [1, 8, 8, 8, 16]
//! ```

extern crate alloc;

mod config;
mod error;
mod involution;
mod lazy;
mod mapping;
mod pool;

/// Padding helpers for channels-last volumes.
pub mod padding;
/// Volume patch extraction.
pub mod patches;

pub use config::*;
pub use error::*;
pub use involution::*;
pub use lazy::*;
pub use mapping::*;
pub use pool::*;

/// Backend for test cases
#[cfg(test)]
pub(crate) type TestBackend = burn::backend::NdArray<f32>;

/// Backend for autodiff test cases
#[cfg(test)]
pub(crate) type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

