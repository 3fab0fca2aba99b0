use alloc::format;
use alloc::string::{String, ToString};

use burn::config::Config;
use burn::nn::Initializer;
use serde_json::{Map, Value};

use crate::InvolutionError;
use crate::padding::symmetric_pad_amounts;

/// Padding mode of an [involution](crate::Involution3d) layer.
#[derive(Config, Debug, PartialEq)]
pub enum InvolutionPadding {
    /// Pads each spatial axis by reflecting the volume, edge voxel included, so that the output
    /// has the same size as the input at stride 1. Even kernels pad one voxel less after the
    /// volume than before it.
    Symmetric,
    /// Zero padding computed so the output size is `ceil(input / stride)`.
    Same,
    /// No padding applied.
    Valid,
}

/// Configuration to create an [involution](crate::Involution3d) layer, using the
/// [init function](InvolutionConfig::init).
#[derive(Config, Debug)]
pub struct InvolutionConfig {
    /// The number of output channels.
    pub filters: usize,
    /// The size of the kernel, as `[depth, height, width]`.
    #[config(default = "[3, 3, 3]")]
    pub kernel_size: [usize; 3],
    /// The stride, applied to every spatial axis.
    #[config(default = 1)]
    pub strides: usize,
    /// The padding configuration.
    #[config(default = "InvolutionPadding::Symmetric")]
    pub padding: InvolutionPadding,
    /// The number of channels sharing one generated kernel.
    #[config(default = 16)]
    pub channels_per_group: usize,
    /// Compression factor of the kernel generation bottleneck.
    #[config(default = 1)]
    pub reduce_ratio: usize,
    /// The type of function used to initialize the pointwise convolution kernels.
    #[config(default = "Initializer::XavierUniform{gain:1.0}")]
    pub kernel_initializer: Initializer,
}

const GROUPS_KEY: &str = "groups";

impl InvolutionConfig {
    /// Number of channel groups, `filters / channels_per_group`.
    ///
    /// The division is floored: when `filters` isn't a multiple of `channels_per_group`, the
    /// trailing channels don't form a group.
    pub fn groups(&self) -> usize {
        self.filters
            .checked_div(self.channels_per_group)
            .unwrap_or_default()
    }

    /// Number of taps in one kernel window.
    pub fn kernel_volume(&self) -> usize {
        self.kernel_size.iter().product()
    }

    /// Width of the kernel generation bottleneck, `filters / reduce_ratio`.
    pub fn reduced_channels(&self) -> usize {
        self.filters.checked_div(self.reduce_ratio).unwrap_or_default()
    }

    /// The `(before, after)` reflection padding of each spatial axis under
    /// [symmetric](InvolutionPadding::Symmetric) padding.
    pub fn symmetric_padding(&self) -> [(usize, usize); 3] {
        self.kernel_size.map(symmetric_pad_amounts)
    }

    /// Checks that a layer built from this configuration for `channels_in` input channels can run.
    ///
    /// [init](InvolutionConfig::init) doesn't call this, so misconfigurations otherwise only
    /// surface on the first forward pass.
    pub fn validate(&self, channels_in: usize) -> Result<(), InvolutionError> {
        let zero_field = [
            ("filters", self.filters),
            ("strides", self.strides),
            ("channels_per_group", self.channels_per_group),
            ("reduce_ratio", self.reduce_ratio),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);

        if let Some((name, _)) = zero_field {
            return Err(InvolutionError::InvalidConfig {
                reason: format!("{name} must be greater than zero"),
            });
        }

        if self.kernel_size.contains(&0) {
            return Err(InvolutionError::InvalidConfig {
                reason: format!("kernel_size {:?} has an empty axis", self.kernel_size),
            });
        }

        if channels_in == 0 {
            return Err(InvolutionError::InvalidConfig {
                reason: "the input must have at least one channel".to_string(),
            });
        }

        if self.filters % self.channels_per_group != 0 {
            return Err(InvolutionError::InexactGroups {
                filters: self.filters,
                channels_per_group: self.channels_per_group,
            });
        }

        let reduced = self.reduced_channels();
        let groups = self.groups();

        if reduced == 0 || reduced % groups != 0 {
            return Err(InvolutionError::InvalidConfig {
                reason: format!(
                    "the reduced width filters / reduce_ratio = {reduced} must be a non-zero multiple of groups = {groups}"
                ),
            });
        }

        Ok(())
    }

    /// Serializes the configuration into a flat mapping holding the seven hyperparameters plus
    /// the derived `groups`.
    pub fn to_map(&self) -> Result<Map<String, Value>, InvolutionError> {
        let value =
            serde_json::to_value(self).map_err(|err| InvolutionError::Config(format!("{err}")))?;

        let Value::Object(mut map) = value else {
            return Err(InvolutionError::Config(
                "the configuration didn't serialize to a mapping".to_string(),
            ));
        };
        map.insert(GROUPS_KEY.to_string(), Value::from(self.groups()));

        Ok(map)
    }

    /// Rebuilds a configuration from a mapping produced by [to_map](InvolutionConfig::to_map).
    ///
    /// A `groups` entry is optional, but when present it must agree with the derived value.
    pub fn from_map(mut map: Map<String, Value>) -> Result<Self, InvolutionError> {
        let groups = match map.remove(GROUPS_KEY) {
            Some(value) => Some(value.as_u64().ok_or_else(|| {
                InvolutionError::Config(format!("groups must be an unsigned integer, got {value}"))
            })?),
            None => None,
        };

        let config: Self = serde_json::from_value(Value::Object(map))
            .map_err(|err| InvolutionError::Config(format!("{err}")))?;

        if let Some(found) = groups {
            let expected = config.groups();

            if found != expected as u64 {
                return Err(InvolutionError::InconsistentGroups {
                    expected,
                    found: found as usize,
                });
            }
        }

        Ok(config)
    }
}
