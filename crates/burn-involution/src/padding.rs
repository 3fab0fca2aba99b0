//! All tensors are channels-last, `[batch, depth, height, width, channels]`, and padding is given
//! as `(before, after)` pairs for the depth, height and width axes.

use alloc::vec;
use alloc::vec::Vec;

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

/// The `(before, after)` reflection padding that keeps an axis the same size when it is swept by
/// a kernel of the given extent at stride 1.
///
/// Odd kernels pad `k / 2` on both sides. Even kernels pad one voxel less after the volume.
pub fn symmetric_pad_amounts(kernel_size: usize) -> (usize, usize) {
    let before = kernel_size / 2;

    if kernel_size % 2 == 0 {
        (before, before.saturating_sub(1))
    } else {
        (before, before)
    }
}

/// Calculate asymmetric padding for "same" convolution.
/// Returns (start_padding, end_padding), the extra voxel of an odd total going to the end.
pub fn same_pad_amounts(kernel_size: usize, stride: usize, size_in: usize) -> (usize, usize) {
    let size_out = size_in.div_ceil(stride);
    let total_padding = if size_out > 0 {
        let needed = (size_out - 1) * stride + kernel_size;
        needed.saturating_sub(size_in)
    } else {
        0
    };
    let pad_start = total_padding / 2;
    let pad_end = total_padding - pad_start;
    (pad_start, pad_end)
}

/// Source indices of a reflected axis of length `size` padded by `before` and `after`.
///
/// The reflection repeats the edge voxel (`c b a | a b c | c b a`) and keeps folding when the
/// padding is wider than the axis.
pub fn reflect_indices(size: usize, before: usize, after: usize) -> Vec<i64> {
    if size == 0 {
        return Vec::new();
    }

    let size = size as i64;
    let period = 2 * size;

    (0..size + (before + after) as i64)
        .map(|position| {
            let folded = (position - before as i64).rem_euclid(period);
            if folded < size {
                folded
            } else {
                period - 1 - folded
            }
        })
        .collect()
}

/// Pads the spatial axes of a volume by symmetric reflection.
pub fn pad_symmetric<B: Backend>(tensor: Tensor<B, 5>, padding: [(usize, usize); 3]) -> Tensor<B, 5> {
    let device = tensor.device();

    padding
        .into_iter()
        .enumerate()
        .fold(tensor, |tensor, (axis, (before, after))| {
            if before == 0 && after == 0 {
                return tensor;
            }

            let dim = axis + 1;
            let indices = reflect_indices(tensor.dims()[dim], before, after);
            tensor.select(dim, index_tensor::<B>(indices, &device))
        })
}

/// Pads the spatial axes of a volume with zeros.
pub fn pad_zeros<B: Backend>(tensor: Tensor<B, 5>, padding: [(usize, usize); 3]) -> Tensor<B, 5> {
    let device = tensor.device();

    padding
        .into_iter()
        .enumerate()
        .fold(tensor, |tensor, (axis, (before, after))| {
            if before == 0 && after == 0 {
                return tensor;
            }

            let dim = axis + 1;
            let mut parts = vec![];

            if before > 0 {
                let mut shape = tensor.dims();
                shape[dim] = before;
                parts.push(Tensor::zeros(shape, &device));
            }

            let mut shape = tensor.dims();
            parts.push(tensor);

            if after > 0 {
                shape[dim] = after;
                parts.push(Tensor::zeros(shape, &device));
            }

            Tensor::cat(parts, dim)
        })
}

/// Builds a 1D index tensor for [select](Tensor::select).
pub(crate) fn index_tensor<B: Backend>(indices: Vec<i64>, device: &B::Device) -> Tensor<B, 1, Int> {
    let length = indices.len();
    let data = TensorData::new(indices, [length]).convert::<B::IntElem>();

    Tensor::from_data(data, device)
}
