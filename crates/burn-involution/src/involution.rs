use alloc::format;

use burn::module::{Content, DisplaySettings, Ignored, Module, ModuleDisplay};
use burn::nn::Initializer;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use crate::padding::{pad_symmetric, same_pad_amounts, symmetric_pad_amounts};
use crate::patches::{extract_volume_patches, output_size};
use crate::{
    AvgPool3d, AvgPool3dConfig, InvolutionConfig, InvolutionError, InvolutionPadding,
    PointwiseConv3d, PointwiseConv3dConfig, ReduceMapping, ReduceMappingConfig,
};

/// Applies a 3D involution over channels-last input volumes.
///
/// Every output voxel is a weighted sum of the neighborhood of the matching input voxel. The
/// weights are generated from the input itself by the `reduce_mapping` and `span_mapping`
/// bottleneck: one kernel per voxel and per group, shared by the `channels_per_group` channels
/// of that group.
///
/// Should be created with [InvolutionConfig].
#[derive(Module, Debug)]
#[module(custom_display)]
pub struct Involution3d<B: Backend> {
    /// Lifts the input to `filters` channels, present when the input has a different width.
    pub initial_mapping: Option<PointwiseConv3d<B>>,
    /// Compresses the input into the kernel generation summary.
    pub reduce_mapping: ReduceMapping<B>,
    /// Expands the summary into `kernel_volume * groups` kernel weights per voxel.
    pub span_mapping: PointwiseConv3d<B>,
    /// Subsamples the input before kernel generation, present when `strides > 1`.
    pub o_mapping: Option<AvgPool3d>,
    /// The number of input channels the layer was built for.
    pub channels_in: usize,
    /// The number of output channels.
    pub filters: usize,
    /// Size of the kernel.
    pub kernel_size: [usize; 3],
    /// Stride of the involution.
    pub strides: usize,
    /// The number of channels sharing one generated kernel.
    pub channels_per_group: usize,
    /// The number of channel groups.
    pub groups: usize,
    /// Compression factor of the kernel generation bottleneck.
    pub reduce_ratio: usize,
    /// The padding configuration.
    pub padding: Ignored<InvolutionPadding>,
    /// The initializer the kernels were created with.
    pub kernel_initializer: Ignored<Initializer>,
}

impl InvolutionConfig {
    /// Initialize a new [involution](Involution3d) module for inputs with `channels_in` channels.
    ///
    /// The configuration isn't validated, see [validate](InvolutionConfig::validate).
    pub fn init<B: Backend>(&self, channels_in: usize, device: &B::Device) -> Involution3d<B> {
        let groups = self.groups();
        let reduced = self.reduced_channels();
        let kernel_volume = self.kernel_volume();

        if self.channels_per_group == 0 || self.filters % self.channels_per_group != 0 {
            log::warn!(
                "filters ({}) is not a multiple of channels_per_group ({}), only {} groups are used",
                self.filters,
                self.channels_per_group,
                groups
            );
        }

        let initial_mapping = (channels_in != self.filters).then(|| {
            PointwiseConv3dConfig::new([channels_in, self.filters])
                .with_initializer(self.kernel_initializer.clone())
                .init(device)
        });
        let reduce_mapping = ReduceMappingConfig::new([channels_in, reduced], groups)
            .with_initializer(self.kernel_initializer.clone())
            .init(device);
        let span_mapping = PointwiseConv3dConfig::new([reduced, kernel_volume * groups])
            .with_initializer(self.kernel_initializer.clone())
            .init(device);
        let o_mapping = (self.strides > 1).then(|| AvgPool3dConfig::new(self.strides).init());

        log::debug!(
            "Involution3d built: {channels_in} -> {} channels, {groups} groups, kernel {:?} ({kernel_volume} taps), {reduced} reduced channels, lift: {}, subsample: {}",
            self.filters,
            self.kernel_size,
            initial_mapping.is_some(),
            o_mapping.is_some(),
        );

        Involution3d {
            initial_mapping,
            reduce_mapping,
            span_mapping,
            o_mapping,
            channels_in,
            filters: self.filters,
            kernel_size: self.kernel_size,
            strides: self.strides,
            channels_per_group: self.channels_per_group,
            groups,
            reduce_ratio: self.reduce_ratio,
            padding: Ignored(self.padding.clone()),
            kernel_initializer: Ignored(self.kernel_initializer.clone()),
        }
    }

    /// [Validate](InvolutionConfig::validate) the configuration, then
    /// [initialize](InvolutionConfig::init) the module.
    pub fn try_init<B: Backend>(
        &self,
        channels_in: usize,
        device: &B::Device,
    ) -> Result<Involution3d<B>, InvolutionError> {
        self.validate(channels_in)?;
        Ok(self.init(channels_in, device))
    }
}

impl<B: Backend> ModuleDisplay for Involution3d<B> {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        let padding_formatted = format!("{}", &self.padding.0);
        let kernel_size = format!("{:?}", self.kernel_size);

        content
            .add("channels_in", &self.channels_in)
            .add("filters", &self.filters)
            .add("kernel_size", &kernel_size)
            .add("strides", &self.strides)
            .add("groups", &self.groups)
            .add("padding", &padding_formatted)
            .optional()
    }
}

impl<B: Backend> Involution3d<B> {
    /// The configuration the module was built from.
    pub fn config(&self) -> InvolutionConfig {
        InvolutionConfig::new(self.filters)
            .with_kernel_size(self.kernel_size)
            .with_strides(self.strides)
            .with_padding(self.padding.0.clone())
            .with_channels_per_group(self.channels_per_group)
            .with_reduce_ratio(self.reduce_ratio)
            .with_kernel_initializer(self.kernel_initializer.0.clone())
    }

    /// Number of taps in one kernel window.
    pub fn kernel_volume(&self) -> usize {
        self.kernel_size.iter().product()
    }

    /// Output spatial shape for the given input spatial shape.
    pub fn output_shape(&self, spatial: [usize; 3]) -> Result<[usize; 3], InvolutionError> {
        if self.strides == 0 || self.kernel_size.contains(&0) {
            return Err(InvolutionError::InvalidConfig {
                reason: format!(
                    "strides ({}) and kernel_size {:?} must be non-zero",
                    self.strides, self.kernel_size
                ),
            });
        }

        let mut shape = [0; 3];

        for axis in 0..3 {
            shape[axis] = output_size(
                spatial[axis],
                self.kernel_size[axis],
                self.strides,
                &self.padding.0,
            )
            .ok_or_else(|| InvolutionError::InvalidInput {
                reason: format!(
                    "axis {axis} of size {} is smaller than the kernel extent {} under valid padding",
                    spatial[axis], self.kernel_size[axis]
                ),
            })?;
        }

        Ok(shape)
    }

    /// Generates the per-voxel kernels from the input.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, depth_in, height_in, width_in, channels_in]`
    /// - output: `[batch_size, depth_out, height_out, width_out, kernel_volume, groups]`
    pub fn generate_weights(&self, input: Tensor<B, 5>) -> Tensor<B, 6> {
        let input = match &self.o_mapping {
            Some(pool) => pool.forward(input),
            None => input,
        };
        let weights = self
            .span_mapping
            .forward(self.reduce_mapping.forward(input));
        let [batch_size, depth, height, width, _] = weights.dims();

        weights.reshape([
            batch_size,
            depth,
            height,
            width,
            self.kernel_volume(),
            self.groups,
        ])
    }

    /// Extracts the kernel neighborhood of every output voxel from the input, lifted to `filters`
    /// channels.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, depth_in, height_in, width_in, channels_in]`
    /// - output: `[batch_size, depth_out, height_out, width_out, kernel_volume, filters]`
    pub fn extract_patches(&self, input: Tensor<B, 5>) -> Tensor<B, 6> {
        let [_, depth, height, width, _] = input.dims();
        let mut zero_padding = [(0, 0); 3];

        let input = match &self.padding.0 {
            InvolutionPadding::Symmetric => pad_symmetric(input, self.symmetric_padding()),
            InvolutionPadding::Same => {
                for (axis, size) in [depth, height, width].into_iter().enumerate() {
                    zero_padding[axis] =
                        same_pad_amounts(self.kernel_size[axis], self.strides, size);
                }
                input
            }
            InvolutionPadding::Valid => input,
        };

        // Symmetric padding is applied before the lift, zero padding after it.
        let input = match &self.initial_mapping {
            Some(mapping) => mapping.forward(input),
            None => input,
        };

        extract_volume_patches(input, self.kernel_size, self.strides, zero_padding)
    }

    /// Applies the forward pass on the input tensor.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, depth_in, height_in, width_in, channels_in]`
    /// - output: `[batch_size, depth_out, height_out, width_out, filters]`
    ///
    /// # Panics
    ///
    /// When [try_forward](Involution3d::try_forward) returns an error.
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        match self.try_forward(input) {
            Ok(output) => output,
            Err(err) => panic!("{err}"),
        }
    }

    /// Applies the forward pass on the input tensor, reporting shape errors instead of panicking.
    pub fn try_forward(&self, input: Tensor<B, 5>) -> Result<Tensor<B, 5>, InvolutionError> {
        let [_batch_size, depth, height, width, channels] = input.dims();

        if channels != self.channels_in {
            return Err(InvolutionError::ChannelMismatch {
                expected: self.channels_in,
                found: channels,
            });
        }

        if self.groups * self.channels_per_group != self.filters {
            return Err(InvolutionError::InexactGroups {
                filters: self.filters,
                channels_per_group: self.channels_per_group,
            });
        }

        if !self.reduce_mapping.is_normalized() {
            return Err(InvolutionError::InvalidConfig {
                reason: format!(
                    "the reduced width filters / reduce_ratio = {} must be a non-zero multiple of groups = {}",
                    self.filters.checked_div(self.reduce_ratio).unwrap_or_default(),
                    self.groups
                ),
            });
        }

        let spatial = [depth, height, width];
        if spatial.contains(&0) {
            return Err(InvolutionError::InvalidInput {
                reason: format!("the volume {spatial:?} has an empty spatial axis"),
            });
        }

        let patches_shape = self.output_shape(spatial)?;
        let weights_shape = match &self.o_mapping {
            Some(pool) => pool.output_shape(spatial),
            None => spatial,
        };

        if weights_shape.contains(&0) {
            return Err(InvolutionError::InvalidInput {
                reason: format!(
                    "the volume {spatial:?} is smaller than the stride {}",
                    self.strides
                ),
            });
        }

        if weights_shape != patches_shape {
            return Err(InvolutionError::ShapeMismatch {
                weights: weights_shape,
                patches: patches_shape,
            });
        }

        let weights = self.generate_weights(input.clone());
        let patches = self.extract_patches(input);

        Ok(weighted_sum(weights, patches, self.channels_per_group))
    }

    fn symmetric_padding(&self) -> [(usize, usize); 3] {
        self.kernel_size.map(symmetric_pad_amounts)
    }
}

/// Sums the patches weighted by the generated kernels, each kernel shared by the channels of
/// its group.
///
/// # Shapes
///
/// - weights: `[batch_size, depth, height, width, kernel_volume, groups]`
/// - patches: `[batch_size, depth, height, width, kernel_volume, groups * channels_per_group]`
/// - output: `[batch_size, depth, height, width, groups * channels_per_group]`
pub(crate) fn weighted_sum<B: Backend>(
    weights: Tensor<B, 6>,
    patches: Tensor<B, 6>,
    channels_per_group: usize,
) -> Tensor<B, 5> {
    let [batch_size, depth, height, width, kernel_volume, groups] = weights.dims();
    let voxels = batch_size * depth * height * width;

    let weights = weights.reshape([voxels, kernel_volume, groups, 1]);
    let patches = patches.reshape([voxels, kernel_volume, groups, channels_per_group]);

    (weights * patches).sum_dim(1).reshape([
        batch_size,
        depth,
        height,
        width,
        groups * channels_per_group,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tolerance;
    use crate::{TestAutodiffBackend, TestBackend};
    use burn::tensor::{Distribution, Int, TensorData};

    fn random_input(shape: [usize; 5]) -> Tensor<TestBackend, 5> {
        Tensor::random(shape, Distribution::Default, &Default::default())
    }

    #[test]
    fn symmetric_keeps_spatial_shape() {
        let device = Default::default();
        let input = random_input([1, 5, 6, 7, 8]);

        for k in 1..=7 {
            for kernel_size in [[k, k, k], [k, 1, 2], [2, k, 3]] {
                let layer = InvolutionConfig::new(8)
                    .with_kernel_size(kernel_size)
                    .with_channels_per_group(4)
                    .init::<TestBackend>(8, &device);

                let output = layer.forward(input.clone());

                assert_eq!(output.dims(), [1, 5, 6, 7, 8], "kernel_size={kernel_size:?}");
            }
        }
    }

    #[test]
    fn reference_scenario() {
        let device = Default::default();
        let layer = InvolutionConfig::new(16).init::<TestBackend>(16, &device);

        let output = layer.forward(random_input([1, 8, 8, 8, 16]));

        assert_eq!(output.dims(), [1, 8, 8, 8, 16]);
    }

    #[test]
    fn stride_two_halves_resolution() {
        let device = Default::default();
        let layer = InvolutionConfig::new(16)
            .with_strides(2)
            .init::<TestBackend>(16, &device);

        assert!(layer.o_mapping.is_some());
        let output = layer.forward(random_input([1, 8, 8, 8, 16]));

        assert_eq!(output.dims(), [1, 4, 4, 4, 16]);
    }

    #[test]
    fn same_padding_with_stride() {
        let device = Default::default();
        let layer = InvolutionConfig::new(8)
            .with_strides(2)
            .with_padding(InvolutionPadding::Same)
            .with_channels_per_group(2)
            .init::<TestBackend>(8, &device);

        let output = layer.forward(random_input([2, 6, 4, 8, 8]));

        assert_eq!(output.dims(), [2, 3, 2, 4, 8]);
    }

    #[test]
    fn valid_padding_with_unit_kernel() {
        let device = Default::default();
        let layer = InvolutionConfig::new(4)
            .with_kernel_size([1, 1, 1])
            .with_padding(InvolutionPadding::Valid)
            .with_channels_per_group(2)
            .init::<TestBackend>(4, &device);

        let output = layer.forward(random_input([1, 3, 4, 5, 4]));

        assert_eq!(output.dims(), [1, 3, 4, 5, 4]);
    }

    #[test]
    fn unit_kernel_scales_each_voxel() {
        let device = Default::default();
        let layer = InvolutionConfig::new(4)
            .with_kernel_size([1, 1, 1])
            .with_channels_per_group(4)
            .init::<TestBackend>(4, &device);
        let input = random_input([2, 3, 3, 3, 4]);

        let weights = layer.generate_weights(input.clone());
        assert_eq!(weights.dims(), [2, 3, 3, 3, 1, 1]);

        let output = layer.forward(input.clone());
        let expected = input * weights.reshape([2, 3, 3, 3, 1]);

        output
            .into_data()
            .assert_approx_eq::<f32>(&expected.into_data(), Tolerance::absolute(1e-5));
    }

    #[test]
    fn lift_when_channels_differ() {
        let device = Default::default();
        let layer = InvolutionConfig::new(8)
            .with_channels_per_group(4)
            .init::<TestBackend>(3, &device);

        assert!(layer.initial_mapping.is_some());
        assert_eq!(layer.reduce_mapping.conv.weight.dims(), [3, 8]);
        assert_eq!(layer.span_mapping.weight.dims(), [8, 27 * 2]);

        let output = layer.forward(random_input([1, 4, 4, 4, 3]));
        assert_eq!(output.dims(), [1, 4, 4, 4, 8]);

        let same_width = InvolutionConfig::new(8)
            .with_channels_per_group(4)
            .init::<TestBackend>(8, &device);
        assert!(same_width.initial_mapping.is_none());
        assert!(same_width.o_mapping.is_none());
    }

    #[test]
    fn reduce_ratio_narrows_bottleneck() {
        let device = Default::default();
        let layer = InvolutionConfig::new(16)
            .with_channels_per_group(4)
            .with_reduce_ratio(4)
            .init::<TestBackend>(16, &device);

        assert_eq!(layer.reduce_mapping.conv.weight.dims(), [16, 4]);
        assert_eq!(layer.span_mapping.weight.dims(), [4, 27 * 4]);
    }

    #[test]
    fn constant_kernels_average_neighborhood() {
        let device = Default::default();
        // A zero span kernel leaves only the bias, which starts at zero. Adding a constant turns
        // every generated kernel into a box filter.
        let mut layer = InvolutionConfig::new(2)
            .with_kernel_size([1, 1, 3])
            .with_channels_per_group(2)
            .with_kernel_initializer(Initializer::Zeros)
            .init::<TestBackend>(2, &device);
        layer.span_mapping.bias = Some(Initializer::Constant { value: 1.0 / 3.0 }.init([3], &device));

        let input = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0, 4.0], &device)
            .reshape([1, 1, 1, 4, 1])
            .repeat(&[1, 1, 1, 1, 2]);

        let output = layer.forward(input);

        // Symmetric padding: 1 | 1 2 3 4 | 4
        let expected = Tensor::<TestBackend, 1>::from_floats(
            [4.0 / 3.0, 2.0, 3.0, 11.0 / 3.0],
            &device,
        )
        .reshape([1, 1, 1, 4, 1])
        .repeat(&[1, 1, 1, 1, 2]);
        output
            .into_data()
            .assert_approx_eq::<f32>(&expected.into_data(), Tolerance::absolute(1e-5));
    }

    #[test]
    fn constant_kernels_average_strided_neighborhood() {
        let device = Default::default();
        let mut layer = InvolutionConfig::new(2)
            .with_kernel_size([1, 1, 3])
            .with_strides(2)
            .with_channels_per_group(2)
            .with_kernel_initializer(Initializer::Zeros)
            .init::<TestBackend>(2, &device);
        layer.span_mapping.bias = Some(Initializer::Constant { value: 1.0 / 3.0 }.init([3], &device));

        let input = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0, 4.0], &device)
            .reshape([1, 1, 1, 4, 1])
            .repeat(&[1, 2, 2, 1, 2]);

        let output = layer.forward(input);

        // Windows centered on width 0 and 2 of 1 | 1 2 3 4 | 4
        let expected = Tensor::<TestBackend, 1>::from_floats([4.0 / 3.0, 3.0], &device)
            .reshape([1, 1, 1, 2, 1])
            .repeat(&[1, 1, 1, 1, 2]);
        output
            .into_data()
            .assert_approx_eq::<f32>(&expected.into_data(), Tolerance::absolute(1e-5));
    }

    #[test]
    fn kernel_order_permutation_is_invariant() {
        let device = Default::default();
        let layer = InvolutionConfig::new(8)
            .with_kernel_size([2, 3, 2])
            .with_channels_per_group(4)
            .init::<TestBackend>(8, &device);
        let input = random_input([1, 4, 4, 4, 8]);

        let weights = layer.generate_weights(input.clone());
        let patches = layer.extract_patches(input);
        let reference = weighted_sum(weights.clone(), patches.clone(), 4);

        let permutation: Vec<i64> = [7, 2, 11, 0, 5, 9, 1, 10, 3, 6, 8, 4].to_vec();
        let indices = Tensor::<TestBackend, 1, Int>::from_data(
            TensorData::new(permutation, [12]).convert::<i64>(),
            &device,
        );
        let permuted = weighted_sum(
            weights.select(4, indices.clone()),
            patches.select(4, indices),
            4,
        );

        permuted
            .into_data()
            .assert_approx_eq::<f32>(&reference.into_data(), Tolerance::absolute(1e-5));
    }

    #[test]
    fn config_round_trip_rebuilds_same_layer() {
        let device = Default::default();
        let config = InvolutionConfig::new(16)
            .with_kernel_size([3, 2, 3])
            .with_strides(2)
            .with_channels_per_group(8)
            .with_reduce_ratio(2);
        let layer = config.init::<TestBackend>(4, &device);

        let restored = InvolutionConfig::from_map(layer.config().to_map().unwrap()).unwrap();
        let rebuilt = restored.init::<TestBackend>(4, &device);

        assert_eq!(rebuilt.groups, layer.groups);
        assert_eq!(rebuilt.kernel_size, layer.kernel_size);
        assert_eq!(rebuilt.strides, layer.strides);
        assert_eq!(rebuilt.padding.0, layer.padding.0);
        assert_eq!(rebuilt.kernel_initializer.0, layer.kernel_initializer.0);

        let input = random_input([2, 6, 6, 6, 4]);
        assert_eq!(
            rebuilt.forward(input.clone()).dims(),
            layer.forward(input).dims()
        );
    }

    #[test]
    fn rejects_wrong_channel_count() {
        let device = Default::default();
        let layer = InvolutionConfig::new(16).init::<TestBackend>(16, &device);

        let result = layer.try_forward(random_input([1, 4, 4, 4, 8]));

        assert_eq!(
            result.unwrap_err(),
            InvolutionError::ChannelMismatch {
                expected: 16,
                found: 8
            }
        );
    }

    #[test]
    fn rejects_valid_padding_with_wide_kernel() {
        let device = Default::default();
        let layer = InvolutionConfig::new(16)
            .with_padding(InvolutionPadding::Valid)
            .init::<TestBackend>(16, &device);

        let result = layer.try_forward(random_input([1, 8, 8, 8, 16]));

        assert_eq!(
            result.unwrap_err(),
            InvolutionError::ShapeMismatch {
                weights: [8, 8, 8],
                patches: [6, 6, 6]
            }
        );
    }

    #[test]
    fn rejects_stride_not_dividing_volume() {
        let device = Default::default();
        let layer = InvolutionConfig::new(16)
            .with_strides(2)
            .init::<TestBackend>(16, &device);

        let result = layer.try_forward(random_input([1, 7, 8, 8, 16]));

        assert_eq!(
            result.unwrap_err(),
            InvolutionError::ShapeMismatch {
                weights: [3, 4, 4],
                patches: [4, 4, 4]
            }
        );
    }

    #[test]
    fn rejects_inexact_groups() {
        let device = Default::default();
        // 12 / 8 floors to a single group that covers only 8 channels.
        let layer = InvolutionConfig::new(12)
            .with_channels_per_group(8)
            .with_reduce_ratio(3)
            .init::<TestBackend>(12, &device);

        assert_eq!(layer.groups, 1);
        assert_eq!(
            layer.try_forward(random_input([1, 2, 2, 2, 12])).unwrap_err(),
            InvolutionError::InexactGroups {
                filters: 12,
                channels_per_group: 8
            }
        );
    }

    #[test]
    fn init_tolerates_inexact_grouping() {
        let device = Default::default();

        // Fewer filters than one group, then 28 / 8 = 3 groups that can't split 28 channels.
        for (filters, channels_per_group) in [(8, 16), (28, 8)] {
            let layer = InvolutionConfig::new(filters)
                .with_channels_per_group(channels_per_group)
                .init::<TestBackend>(filters, &device);

            assert!(!layer.reduce_mapping.is_normalized());
            assert_eq!(
                layer
                    .try_forward(random_input([1, 4, 4, 4, filters]))
                    .unwrap_err(),
                InvolutionError::InexactGroups {
                    filters,
                    channels_per_group
                }
            );
        }
    }

    #[test]
    fn rejects_reduced_width_not_divisible_by_groups() {
        let device = Default::default();
        // 32 / 3 = 10 reduced channels for 4 groups.
        let layer = InvolutionConfig::new(32)
            .with_channels_per_group(8)
            .with_reduce_ratio(3)
            .init::<TestBackend>(32, &device);

        assert!(matches!(
            layer.try_forward(random_input([1, 4, 4, 4, 32])),
            Err(InvolutionError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn output_shape_rejects_zero_sizes() {
        let device = Default::default();

        for config in [
            InvolutionConfig::new(16).with_strides(0),
            InvolutionConfig::new(16).with_kernel_size([3, 0, 3]),
        ] {
            let layer = config.init::<TestBackend>(16, &device);

            assert!(matches!(
                layer.output_shape([4, 4, 4]),
                Err(InvolutionError::InvalidConfig { .. })
            ));
            assert!(matches!(
                layer.try_forward(random_input([1, 4, 4, 4, 16])),
                Err(InvolutionError::InvalidConfig { .. })
            ));
        }
    }

    #[test]
    fn try_init_validates() {
        let device = Default::default();

        assert!(InvolutionConfig::new(16).try_init::<TestBackend>(16, &device).is_ok());
        assert!(matches!(
            InvolutionConfig::new(16)
                .with_channels_per_group(5)
                .try_init::<TestBackend>(16, &device),
            Err(InvolutionError::InexactGroups { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "Expected an input with 16 channels, got 3")]
    fn forward_panics_on_error() {
        let device = Default::default();
        let layer = InvolutionConfig::new(16).init::<TestBackend>(16, &device);

        let _ = layer.forward(random_input([1, 4, 4, 4, 3]));
    }

    #[test]
    fn gradients_reach_every_mapping() {
        let device = Default::default();
        let layer = InvolutionConfig::new(8)
            .with_strides(2)
            .with_channels_per_group(4)
            .init::<TestAutodiffBackend>(4, &device);
        let input = Tensor::<TestAutodiffBackend, 5>::random(
            [1, 4, 4, 4, 4],
            Distribution::Default,
            &device,
        )
        .require_grad();

        let grads = layer.forward(input.clone()).sum().backward();

        assert!(input.grad(&grads).is_some());

        let lift = layer.initial_mapping.as_ref().unwrap();
        assert!(lift.weight.grad(&grads).is_some());
        assert!(lift.bias.as_ref().unwrap().grad(&grads).is_some());

        let reduce = &layer.reduce_mapping;
        assert!(reduce.conv.weight.grad(&grads).is_some());
        assert!(reduce.conv.bias.as_ref().unwrap().grad(&grads).is_some());
        let norm = reduce.norm.as_ref().unwrap();
        assert!(norm.gamma.as_ref().unwrap().grad(&grads).is_some());
        assert!(norm.beta.as_ref().unwrap().grad(&grads).is_some());

        assert!(layer.span_mapping.weight.grad(&grads).is_some());
        assert!(layer.span_mapping.bias.as_ref().unwrap().grad(&grads).is_some());
    }

    #[test]
    fn display() {
        let device = Default::default();
        let layer = InvolutionConfig::new(16).init::<TestBackend>(16, &device);

        let formatted = alloc::format!("{layer}");

        assert!(formatted.starts_with("Involution3d"));
        assert!(formatted.contains("kernel_size: [3, 3, 3]"));
        assert!(formatted.contains("groups: 1"));
    }
}
