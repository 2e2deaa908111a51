//! SSE4.1, AVX and AVX2 kernel sets. Each type can only be constructed after
//! runtime detection confirms the extensions its `target_feature` functions use.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::{band_range, filter_range, lanczos_band, lanczos_kernel, lanczos_taps, Kernels};
use crate::constants::LANCZOS_TAPS;

/// Lanczos taps gathered into fixed-width lanes: weights and samples, zero
/// beyond the used taps.
#[inline(always)]
fn gather_taps(x: f32, data: &[f32]) -> ([f32; 8], [f32; 8]) {
    let mut weights = [0.0f32; 8];
    let mut samples = [0.0f32; 8];
    if data.is_empty() {
        return (weights, samples);
    }

    let (low, high) = lanczos_taps(x, LANCZOS_TAPS, data.len());
    for (lane, i) in (low..=high).enumerate().take(8) {
        weights[lane] = lanczos_kernel(x - i as f32, LANCZOS_TAPS);
        samples[lane] = data[i];
    }
    (weights, samples)
}

//
// SSE4.1
//

/// Four-lane filter and dot-product Lanczos.
pub struct Sse41 {
    _detected: (),
}

impl Sse41 {
    pub fn new() -> Option<Self> {
        is_x86_feature_detected!("sse4.1").then_some(Self { _detected: () })
    }
}

#[target_feature(enable = "sse4.1")]
unsafe fn lanczos_sse41(x: f32, data: &[f32]) -> f32 {
    let (weights, samples) = gather_taps(x, data);
    let lo = _mm_dp_ps::<0xF1>(_mm_loadu_ps(weights.as_ptr()), _mm_loadu_ps(samples.as_ptr()));
    let hi = _mm_dp_ps::<0xF1>(
        _mm_loadu_ps(weights.as_ptr().add(4)),
        _mm_loadu_ps(samples.as_ptr().add(4)),
    );
    _mm_cvtss_f32(_mm_add_ss(lo, hi))
}

#[target_feature(enable = "sse4.1")]
unsafe fn filter_sse41(input: &[f32], kernel: &[f32], out: &mut [f32]) {
    let len = input.len().min(out.len());
    let half = kernel.len() / 2;
    let tail = kernel.len() - half;

    //
    // Interior columns read every tap without clamping, four at a time.
    //
    let start = half;
    let mut i = start;
    while i + 4 + tail <= len + 1 && i + 4 <= len {
        let mut acc = _mm_setzero_ps();
        for (k, weight) in kernel.iter().enumerate() {
            let v = _mm_loadu_ps(input.as_ptr().add(i + k - half));
            acc = _mm_add_ps(acc, _mm_mul_ps(v, _mm_set1_ps(*weight)));
        }
        _mm_storeu_ps(out.as_mut_ptr().add(i), acc);
        i += 4;
    }

    filter_range(input, kernel, out, 0, start.min(len));
    filter_range(input, kernel, out, i.max(start.min(len)), len);
}

impl Kernels for Sse41 {
    fn name(&self) -> &'static str {
        "SSE4.1"
    }

    fn resample_lanczos(&self, spectrum: &[f32], indices: &[f32], out: &mut [f32]) {
        for (out, &index) in out.iter_mut().zip(indices) {
            // SAFETY: constructed only when SSE4.1 was detected.
            *out = unsafe { lanczos_sse41(index, spectrum) };
        }
    }

    fn average_bands(&self, spectrum: &[f32], indices: &[f32], lanczos: bool, out: &mut [f32]) {
        if !lanczos {
            return super::Baseline.average_bands(spectrum, indices, false, out);
        }
        for (i, out) in out.iter_mut().enumerate() {
            *out = lanczos_band(spectrum, indices[i], indices[i + 1], |pos| unsafe {
                // SAFETY: see `resample_lanczos`.
                lanczos_sse41(pos, spectrum)
            });
        }
    }

    fn filter(&self, input: &[f32], kernel: &[f32], out: &mut [f32]) {
        // SAFETY: constructed only when SSE4.1 was detected.
        unsafe { filter_sse41(input, kernel, out) }
    }
}

//
// AVX + FMA
//

/// Eight-lane filter, Lanczos and band sums.
pub struct Avx {
    _detected: (),
}

impl Avx {
    pub fn new() -> Option<Self> {
        (is_x86_feature_detected!("avx") && is_x86_feature_detected!("fma"))
            .then_some(Self { _detected: () })
    }
}

#[target_feature(enable = "avx,fma")]
unsafe fn hsum256(v: __m256) -> f32 {
    let sum = _mm_add_ps(_mm256_castps256_ps128(v), _mm256_extractf128_ps::<1>(v));
    let sum = _mm_add_ps(sum, _mm_movehl_ps(sum, sum));
    let sum = _mm_add_ss(sum, _mm_shuffle_ps::<0b01>(sum, sum));
    _mm_cvtss_f32(sum)
}

#[target_feature(enable = "avx,fma")]
unsafe fn lanczos_avx(x: f32, data: &[f32]) -> f32 {
    let (weights, samples) = gather_taps(x, data);
    hsum256(_mm256_mul_ps(
        _mm256_loadu_ps(weights.as_ptr()),
        _mm256_loadu_ps(samples.as_ptr()),
    ))
}

#[target_feature(enable = "avx,fma")]
unsafe fn sum_avx(values: &[f32]) -> f32 {
    let mut acc = _mm256_setzero_ps();
    let mut i = 0;
    while i + 8 <= values.len() {
        acc = _mm256_add_ps(acc, _mm256_loadu_ps(values.as_ptr().add(i)));
        i += 8;
    }
    hsum256(acc) + values[i..].iter().sum::<f32>()
}

#[target_feature(enable = "avx,fma")]
unsafe fn filter_avx(input: &[f32], kernel: &[f32], out: &mut [f32]) {
    let len = input.len().min(out.len());
    let half = kernel.len() / 2;
    let tail = kernel.len() - half;

    let start = half;
    let mut i = start;
    while i + 8 + tail <= len + 1 && i + 8 <= len {
        let mut acc = _mm256_setzero_ps();
        for (k, weight) in kernel.iter().enumerate() {
            let v = _mm256_loadu_ps(input.as_ptr().add(i + k - half));
            acc = _mm256_fmadd_ps(v, _mm256_set1_ps(*weight), acc);
        }
        _mm256_storeu_ps(out.as_mut_ptr().add(i), acc);
        i += 8;
    }

    filter_range(input, kernel, out, 0, start.min(len));
    filter_range(input, kernel, out, i.max(start.min(len)), len);
}

/// Shared by the AVX and AVX2 sets.
fn average_bands_avx(spectrum: &[f32], indices: &[f32], lanczos: bool, out: &mut [f32]) {
    for (i, out) in out.iter_mut().enumerate() {
        *out = if lanczos {
            lanczos_band(spectrum, indices[i], indices[i + 1], |pos| unsafe {
                // SAFETY: only reachable from kernel sets built after AVX+FMA detection.
                lanczos_avx(pos, spectrum)
            })
        } else {
            let (start, end) = band_range(spectrum.len(), indices[i], indices[i + 1]);
            // SAFETY: as above.
            unsafe { sum_avx(&spectrum[start..end]) / (end - start) as f32 }
        };
    }
}

impl Kernels for Avx {
    fn name(&self) -> &'static str {
        "AVX"
    }

    fn resample_lanczos(&self, spectrum: &[f32], indices: &[f32], out: &mut [f32]) {
        for (out, &index) in out.iter_mut().zip(indices) {
            // SAFETY: constructed only when AVX and FMA were detected.
            *out = unsafe { lanczos_avx(index, spectrum) };
        }
    }

    fn average_bands(&self, spectrum: &[f32], indices: &[f32], lanczos: bool, out: &mut [f32]) {
        average_bands_avx(spectrum, indices, lanczos, out);
    }

    fn filter(&self, input: &[f32], kernel: &[f32], out: &mut [f32]) {
        // SAFETY: as above.
        unsafe { filter_avx(input, kernel, out) }
    }
}

//
// AVX2 + FMA
//

/// The AVX set plus gathered point resampling.
pub struct Avx2 {
    _detected: (),
}

impl Avx2 {
    pub fn new() -> Option<Self> {
        (is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma"))
            .then_some(Self { _detected: () })
    }
}

#[target_feature(enable = "avx2,fma")]
unsafe fn resample_point_avx2(spectrum: &[f32], indices: &[f32], out: &mut [f32]) {
    if spectrum.is_empty() {
        return;
    }

    let len = indices.len().min(out.len());
    let zero = _mm256_setzero_si256();
    let last = _mm256_set1_epi32(spectrum.len().min(i32::MAX as usize) as i32 - 1);
    let mut i = 0;
    while i + 8 <= len {
        //
        // Truncate, clamp into the spectrum, then gather.
        //
        let index = _mm256_cvttps_epi32(_mm256_loadu_ps(indices.as_ptr().add(i)));
        let index = _mm256_max_epi32(_mm256_min_epi32(index, last), zero);
        let v = _mm256_i32gather_ps::<4>(spectrum.as_ptr(), index);
        _mm256_storeu_ps(out.as_mut_ptr().add(i), v);
        i += 8;
    }

    let last = spectrum.len() - 1;
    for j in i..len {
        out[j] = spectrum[(indices[j] as usize).min(last)];
    }
}

impl Kernels for Avx2 {
    fn name(&self) -> &'static str {
        "AVX2"
    }

    fn resample_point(&self, spectrum: &[f32], indices: &[f32], out: &mut [f32]) {
        // SAFETY: AVX2 detection here implies AVX; FMA was detected too.
        unsafe { resample_point_avx2(spectrum, indices, out) }
    }

    fn resample_lanczos(&self, spectrum: &[f32], indices: &[f32], out: &mut [f32]) {
        for (out, &index) in out.iter_mut().zip(indices) {
            // SAFETY: as above.
            *out = unsafe { lanczos_avx(index, spectrum) };
        }
    }

    fn average_bands(&self, spectrum: &[f32], indices: &[f32], lanczos: bool, out: &mut [f32]) {
        average_bands_avx(spectrum, indices, lanczos, out);
    }

    fn filter(&self, input: &[f32], kernel: &[f32], out: &mut [f32]) {
        // SAFETY: as above.
        unsafe { filter_avx(input, kernel, out) }
    }
}
