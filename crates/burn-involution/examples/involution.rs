use burn::backend::{Autodiff, NdArray};
use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, Tensor};
use burn_involution::{InvolutionConfig, InvolutionPadding, LazyInvolution3d};

fn run<B: Backend>(device: &B::Device) {
    let config = InvolutionConfig::new(16)
        .with_kernel_size([3, 3, 3])
        .with_strides(2)
        .with_padding(InvolutionPadding::Symmetric)
        .with_channels_per_group(8)
        .with_reduce_ratio(2);
    println!("{config}");

    let layer = config.init::<B>(16, device);
    println!("{layer}");
    println!("Parameters: {}", layer.num_params());

    let input = Tensor::<B, 5>::random([1, 8, 8, 8, 16], Distribution::Default, device);
    let output = layer.forward(input);
    println!("Output shape: {:?}", output.dims());

    let mut lazy = LazyInvolution3d::<B>::new(config.with_strides(1), device);
    let input = Tensor::<B, 5>::random([2, 4, 6, 6, 3], Distribution::Default, device);
    let output = lazy.forward(input);
    println!("Lazy layer {:?}, output shape: {:?}", lazy.state(), output.dims());
}

fn main() {
    let device = Default::default();

    run::<NdArray>(&device);
    run::<Autodiff<NdArray>>(&device);
}
