use crate::simd::Kernels;

/// Normalised Gaussian kernel with standard deviation `radius`, spanning three
/// deviations on each side. A radius of zero gives the identity kernel.
pub fn gauss_kernel(radius: f32) -> Vec<f32> {
    if radius.is_nan() || radius <= 0.0 {
        return vec![1.0];
    }

    let half = (radius * 3.0).ceil().max(1.0) as usize;
    let denom = 2.0 * radius * radius;
    let mut kernel: Vec<f32> = (0..=half * 2)
        .map(|i| {
            let x = i as f32 - half as f32;
            (-(x * x) / denom).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

/// Gaussian blur across the mapped output columns.
pub struct SpatialFilter {
    kernel: Vec<f32>,
    scratch: Vec<f32>,
}

impl SpatialFilter {
    pub fn new(radius: f32, columns: usize) -> Self {
        Self {
            kernel: gauss_kernel(radius),
            scratch: vec![0.0; columns],
        }
    }

    pub fn kernel(&self) -> &[f32] {
        &self.kernel
    }

    /// Blurs `columns` in place.
    pub fn apply(&mut self, kernels: &dyn Kernels, columns: &mut [f32]) {
        self.scratch.clear();
        self.scratch.extend_from_slice(columns);
        kernels.filter(&self.scratch, &self.kernel, columns);
    }
}
