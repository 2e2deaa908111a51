pub mod engine;

pub use engine::FftEngine;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use realfft::{RealFftPlanner, RealToComplex};
use std::collections::HashMap;
use std::sync::Arc;

lazy_static! {
    static ref PLAN_CACHE: Mutex<HashMap<usize, Arc<dyn RealToComplex<f32>>>> =
        Mutex::new(HashMap::new());
}

/// Returns a forward real-to-complex plan for size `n`, shared between all
/// instances that use the same analysis window.
pub fn find_plan(n: usize) -> Arc<dyn RealToComplex<f32>> {
    let mut cache = PLAN_CACHE.lock();
    if let Some(plan) = cache.get(&n) {
        return plan.clone();
    }

    //
    // Planner state is not kept; plans are cached by size instead.
    //
    let plan = RealFftPlanner::<f32>::new().plan_fft_forward(n);
    cache.insert(n, plan.clone());
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_are_cached_by_size() {
        let a = find_plan(2048);
        let b = find_plan(2048);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 2048);
        assert_eq!(find_plan(720).len(), 720);
    }
}
