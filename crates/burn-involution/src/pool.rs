use burn::config::Config;
use burn::module::Module;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Configuration to create a [3D avg pooling](AvgPool3d) layer using the [init function](AvgPool3dConfig::init).
#[derive(Config, Debug)]
pub struct AvgPool3dConfig {
    /// The size of the cubic window, also used as the stride.
    pub kernel_size: usize,
}

/// Applies a 3D avg pooling over non-overlapping cubic windows of a channels-last volume.
///
/// Should be created with [AvgPool3dConfig].
///
/// # Remarks
///
/// No padding is applied: voxels past the last complete window along an axis are dropped.
#[derive(Module, Clone, Debug)]
pub struct AvgPool3d {
    /// The size of the cubic window, also used as the stride.
    pub kernel_size: usize,
}

impl AvgPool3dConfig {
    /// Initialize a new [avg pool 3d](AvgPool3d) module.
    pub fn init(&self) -> AvgPool3d {
        AvgPool3d {
            kernel_size: self.kernel_size,
        }
    }
}

impl AvgPool3d {
    /// Output spatial shape for the given input spatial shape.
    pub fn output_shape(&self, spatial: [usize; 3]) -> [usize; 3] {
        spatial.map(|size| size / self.kernel_size)
    }

    /// Applies the forward pass on the input tensor.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, depth_in, height_in, width_in, channels]`
    /// - output: `[batch_size, depth_in / k, height_in / k, width_in / k, channels]`
    pub fn forward<B: Backend>(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        let k = self.kernel_size;
        let [batch_size, depth, height, width, channels] = input.dims();
        let [depth_out, height_out, width_out] = self.output_shape([depth, height, width]);

        let input = input.slice([
            0..batch_size,
            0..depth_out * k,
            0..height_out * k,
            0..width_out * k,
            0..channels,
        ]);

        // Average one axis at a time, splitting it into `[windows, k]`.
        let input = input
            .reshape([batch_size, depth_out, k, height_out * k, width_out * k, channels])
            .mean_dim(2)
            .reshape([batch_size, depth_out, height_out * k, width_out * k, channels]);
        let input = input
            .reshape([batch_size, depth_out, height_out, k, width_out * k, channels])
            .mean_dim(3)
            .reshape([batch_size, depth_out, height_out, width_out * k, channels]);

        input
            .reshape([batch_size, depth_out, height_out, width_out, k, channels])
            .mean_dim(4)
            .reshape([batch_size, depth_out, height_out, width_out, channels])
    }
}
