use alloc::string::String;

/// Errors reported by the fallible involution entry points.
///
/// The panicking [forward](crate::Involution3d::forward) uses the same messages.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvolutionError {
    /// A configuration value can never produce a working layer.
    #[error("Invalid involution config: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// `filters` is not a multiple of `channels_per_group`, so the groups don't cover every channel.
    #[error(
        "The number of filters ({filters}) must be divisible by channels_per_group ({channels_per_group})"
    )]
    InexactGroups {
        /// Output channel count.
        filters: usize,
        /// Width of one group.
        channels_per_group: usize,
    },

    /// A serialized config carries a `groups` value that disagrees with its other fields.
    #[error("Serialized groups ({found}) differ from the derived value ({expected})")]
    InconsistentGroups {
        /// `filters / channels_per_group`.
        expected: usize,
        /// Value found in the mapping.
        found: usize,
    },

    /// The input doesn't have the channel count the layer was built for.
    #[error("Expected an input with {expected} channels, got {found}")]
    ChannelMismatch {
        /// Channels the layer was built for.
        expected: usize,
        /// Channels of the input.
        found: usize,
    },

    /// The generated weights and the extracted patches cover different output resolutions.
    #[error(
        "Generated weights have spatial shape {weights:?} but patches have spatial shape {patches:?}"
    )]
    ShapeMismatch {
        /// `[depth, height, width]` of the generated weights.
        weights: [usize; 3],
        /// `[depth, height, width]` of the extracted patches.
        patches: [usize; 3],
    },

    /// The input volume can't be processed.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Why the input was rejected.
        reason: String,
    },

    /// A configuration mapping could not be (de)serialized.
    #[error("Config error => {0}")]
    Config(String),
}
