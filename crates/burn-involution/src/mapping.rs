use burn::config::Config;
use burn::module::{Module, Param};
use burn::nn::{GroupNorm, GroupNormConfig, Initializer};
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use burn::tensor::module::linear;
use burn::tensor::backend::Backend;

/// Configuration to create a [pointwise 3D convolution](PointwiseConv3d) layer, using the
/// [init function](PointwiseConv3dConfig::init).
#[derive(Config, Debug)]
pub struct PointwiseConv3dConfig {
    /// The number of channels.
    pub channels: [usize; 2],
    /// If bias should be added to the output.
    #[config(default = true)]
    pub bias: bool,
    /// The type of function used to initialize the kernel. The bias always starts at zero.
    #[config(default = "Initializer::XavierUniform{gain:1.0}")]
    pub initializer: Initializer,
}

/// Applies a 1×1×1 convolution to a channels-last volume, mixing channels voxel by voxel.
///
/// Unlike [Linear](burn::nn::Linear), the bias starts at zero whatever the kernel initializer.
///
/// Should be created with [PointwiseConv3dConfig].
#[derive(Module, Debug)]
pub struct PointwiseConv3d<B: Backend> {
    /// Tensor of shape `[channels_in, channels_out]`
    pub weight: Param<Tensor<B, 2>>,
    /// Tensor of shape `[channels_out]`
    pub bias: Option<Param<Tensor<B, 1>>>,
}

impl PointwiseConv3dConfig {
    /// Initialize a new [pointwise conv3d](PointwiseConv3d) module.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PointwiseConv3d<B> {
        let [channels_in, channels_out] = self.channels;

        let weight = self.initializer.init_with(
            [channels_in, channels_out],
            Some(channels_in),
            Some(channels_out),
            device,
        );
        let bias = self
            .bias
            .then(|| Initializer::Zeros.init([channels_out], device));

        PointwiseConv3d { weight, bias }
    }
}

impl<B: Backend> PointwiseConv3d<B> {
    /// Applies the forward pass on the input tensor.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, depth, height, width, channels_in]`
    /// - output: `[batch_size, depth, height, width, channels_out]`
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        linear(
            input,
            self.weight.val(),
            self.bias.as_ref().map(|bias| bias.val()),
        )
    }
}

/// Configuration to create the [kernel generation bottleneck](ReduceMapping), using the
/// [init function](ReduceMappingConfig::init).
#[derive(Config, Debug)]
pub struct ReduceMappingConfig {
    /// The number of channels.
    pub channels: [usize; 2],
    /// The number of groups of the normalization.
    pub num_groups: usize,
    /// A value required for numerical stability of the normalization.
    #[config(default = 1e-3)]
    pub epsilon: f64,
    /// The type of function used to initialize the convolution kernel.
    #[config(default = "Initializer::XavierUniform{gain:1.0}")]
    pub initializer: Initializer,
}

/// Compresses every voxel into a low-dimensional summary: pointwise convolution, group
/// normalization, then ReLU.
///
/// Should be created with [ReduceMappingConfig].
#[derive(Module, Debug)]
pub struct ReduceMapping<B: Backend> {
    /// Channel compression.
    pub conv: PointwiseConv3d<B>,
    /// Normalization over the compressed channels, absent when they can't be split into the
    /// configured number of groups.
    pub norm: Option<GroupNorm<B>>,
}

impl ReduceMappingConfig {
    /// Initialize a new [reduce mapping](ReduceMapping) module.
    ///
    /// The normalization is left out when the compressed channels can't be split into
    /// `num_groups` groups, see [is_normalized](ReduceMapping::is_normalized).
    pub fn init<B: Backend>(&self, device: &B::Device) -> ReduceMapping<B> {
        let conv = PointwiseConv3dConfig::new(self.channels)
            .with_initializer(self.initializer.clone())
            .init(device);
        let channels = self.channels[1];

        let norm = if self.num_groups > 0 && channels > 0 && channels % self.num_groups == 0 {
            Some(
                GroupNormConfig::new(self.num_groups, channels)
                    .with_epsilon(self.epsilon)
                    .init(device),
            )
        } else {
            log::warn!(
                "{channels} reduced channels can't be split into {} groups, the normalization is skipped",
                self.num_groups
            );
            None
        };

        ReduceMapping { conv, norm }
    }
}

impl<B: Backend> ReduceMapping<B> {
    /// Whether the group normalization was built.
    pub fn is_normalized(&self) -> bool {
        self.norm.is_some()
    }

    /// Applies the forward pass on the input tensor.
    ///
    /// Without normalization, only the convolution and the ReLU are applied.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, depth, height, width, channels_in]`
    /// - output: `[batch_size, depth, height, width, channels_out]`
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        let x = self.conv.forward(input);
        let Some(norm) = &self.norm else {
            return relu(x);
        };
        let [batch_size, depth, height, width, channels] = x.dims();

        // Group norm expects the channels right after the batch.
        let x = x
            .reshape([batch_size, depth * height * width, channels])
            .swap_dims(1, 2);
        let x = norm
            .forward(x)
            .swap_dims(1, 2)
            .reshape([batch_size, depth, height, width, channels]);

        relu(x)
    }
}
