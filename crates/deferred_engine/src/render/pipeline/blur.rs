//! Separable Gaussian blur of the shadow map
//!
//! Kernel construction and dispatch sizing. The two compute passes that use
//! them live in the orchestrator.

use crate::core::MAX_BLUR_HALF_WIDTH;

/// Length of the `weights` uniform array in the blur shaders
pub const KERNEL_CAPACITY: usize = 2 * MAX_BLUR_HALF_WIDTH as usize + 1;

/// Work-group width declared by the blur shaders
pub const WORKGROUP_SIZE: u32 = 128;

/// `mode` value that disables blurring
pub const BLUR_BYPASS_MODE: i32 = 2;

/// Normalized Gaussian weights for `half_width`, `2 * half_width + 1` taps.
///
/// Tap `i` is `exp(-0.5 * ((i - w) / (w / 2))^2)` before normalization; a
/// half-width of zero is the identity kernel `[1.0]`.
pub fn gaussian_kernel(half_width: u32) -> Vec<f32> {
    if half_width == 0 {
        return vec![1.0];
    }

    let w = half_width as f32;
    let sigma = w / 2.0;
    let raw: Vec<f32> = (0..=2 * half_width)
        .map(|i| {
            let x = (i as f32 - w) / sigma;
            (-0.5 * x * x).exp()
        })
        .collect();

    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|v| v / sum).collect()
}

/// Kernel for `half_width` zero-padded to [`KERNEL_CAPACITY`] entries
pub fn padded_kernel(half_width: u32) -> Vec<f32> {
    let mut weights = gaussian_kernel(half_width.min(MAX_BLUR_HALF_WIDTH));
    weights.resize(KERNEL_CAPACITY, 0.0);
    weights
}

/// Half-width actually used this frame; `mode == 2` bypasses the blur.
pub fn effective_half_width(mode: i32, configured: u32) -> u32 {
    if mode == BLUR_BYPASS_MODE {
        0
    } else {
        configured.min(MAX_BLUR_HALF_WIDTH)
    }
}

/// Work groups covering `extent` texels with [`WORKGROUP_SIZE`] wide groups
pub fn group_count(extent: u32) -> u32 {
    extent.div_ceil(WORKGROUP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_sums_to_one() {
        for half_width in [0, 5, 10, MAX_BLUR_HALF_WIDTH] {
            let kernel = gaussian_kernel(half_width);
            assert_eq!(kernel.len(), 2 * half_width as usize + 1);
            assert_relative_eq!(kernel.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_kernel_is_symmetric_and_peaked() {
        let kernel = gaussian_kernel(10);
        for i in 0..10 {
            assert_relative_eq!(kernel[i], kernel[20 - i], epsilon = 1e-7);
            assert!(kernel[i] < kernel[i + 1]);
        }
    }

    #[test]
    fn test_kernel_matches_formula() {
        let kernel = gaussian_kernel(4);
        let raw: Vec<f32> = (0..9).map(|i| (-0.5 * ((i as f32 - 4.0) / 2.0).powi(2)).exp()).collect();
        let sum: f32 = raw.iter().sum();
        for (k, r) in kernel.iter().zip(raw) {
            assert_relative_eq!(*k, r / sum, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_zero_width_is_identity() {
        assert_eq!(gaussian_kernel(0), vec![1.0]);
    }

    #[test]
    fn test_padded_kernel_length() {
        let padded = padded_kernel(10);
        assert_eq!(padded.len(), 101);
        assert!(padded[21..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_mode_two_bypasses_blur() {
        assert_eq!(effective_half_width(2, 10), 0);
        assert_eq!(effective_half_width(1, 10), 10);
        assert_eq!(effective_half_width(3, 200), MAX_BLUR_HALF_WIDTH);
    }

    #[test]
    fn test_group_count_rounds_up() {
        assert_eq!(group_count(4000), 32);
        assert_eq!(group_count(128), 1);
        assert_eq!(group_count(129), 2);
    }
}
