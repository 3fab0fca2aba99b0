use alloc::vec::Vec;

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use crate::InvolutionPadding;
use crate::padding::{index_tensor, pad_zeros};

/// Size of an output axis for an input axis of `size_in` voxels.
///
/// Returns `None` when [valid](InvolutionPadding::Valid) padding leaves no complete window.
pub fn output_size(
    size_in: usize,
    kernel_size: usize,
    stride: usize,
    padding: &InvolutionPadding,
) -> Option<usize> {
    match padding {
        // Symmetric padding grows the axis by `kernel_size - 1`, which is the same output size
        // as `Same` zero padding.
        InvolutionPadding::Symmetric | InvolutionPadding::Same => Some(size_in.div_ceil(stride)),
        InvolutionPadding::Valid => size_in
            .checked_sub(kernel_size)
            .map(|remaining| remaining / stride + 1),
    }
}

/// Gathers the kernel-sized neighborhood of every output voxel.
///
/// The input is zero padded by `padding` first, then swept by a window of `kernel_size` with the
/// given stride and no further padding. Taps are ordered depth-major, then height, then width,
/// which is the order in which generated kernels are laid out.
///
/// # Shapes
///
/// - input: `[batch_size, depth_in, height_in, width_in, channels]`
/// - output: `[batch_size, depth_out, height_out, width_out, kernel_volume, channels]`
///
/// # Panics
///
/// If a padded axis is smaller than the kernel along that axis.
pub fn extract_volume_patches<B: Backend>(
    input: Tensor<B, 5>,
    kernel_size: [usize; 3],
    stride: usize,
    padding: [(usize, usize); 3],
) -> Tensor<B, 6> {
    let input = pad_zeros(input, padding);
    let [_batch_size, depth, height, width, _channels] = input.dims();
    let device = input.device();

    let window_indices = |axis: usize, size: usize| -> Vec<Vec<i64>> {
        let kernel = kernel_size[axis];
        assert!(
            size >= kernel,
            "Axis {axis} of size {size} is smaller than the kernel extent {kernel}"
        );
        let size_out = (size - kernel) / stride + 1;

        (0..kernel)
            .map(|offset| {
                (0..size_out)
                    .map(|position| (position * stride + offset) as i64)
                    .collect()
            })
            .collect()
    };

    let depth_taps = window_indices(0, depth);
    let height_taps = window_indices(1, height);
    let width_taps = window_indices(2, width);

    let mut taps = Vec::with_capacity(kernel_size.iter().product());

    for depth_indices in depth_taps {
        let plane = input
            .clone()
            .select(1, index_tensor::<B>(depth_indices, &device));

        for height_indices in height_taps.iter() {
            let row = plane
                .clone()
                .select(2, index_tensor::<B>(height_indices.clone(), &device));

            for width_indices in width_taps.iter() {
                let tap = row
                    .clone()
                    .select(3, index_tensor::<B>(width_indices.clone(), &device));
                taps.push(tap);
            }
        }
    }

    Tensor::stack(taps, 4)
}
