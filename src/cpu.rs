use lazy_static::lazy_static;
use std::fmt;

/// Frozen description of the vector extensions available on this CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuFeatures {
    /// AVX2 together with FMA.
    pub avx2: bool,
    /// AVX together with FMA.
    pub avx: bool,
    pub sse41: bool,
    pub fma: bool,
}

lazy_static! {
    //
    // Detected once, read-only afterwards.
    //
    static ref CPU_FEATURES: CpuFeatures = CpuFeatures::detect();
}

impl CpuFeatures {
    /// Descriptor for the running process.
    pub fn current() -> Self {
        *CPU_FEATURES
    }

    /// No extensions beyond the baseline.
    pub fn baseline() -> Self {
        Self::default()
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    fn detect() -> Self {
        let fma = is_x86_feature_detected!("fma");
        Self {
            avx2: is_x86_feature_detected!("avx2") && fma,
            avx: is_x86_feature_detected!("avx") && fma,
            sse41: is_x86_feature_detected!("sse4.1"),
            fma,
        }
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    fn detect() -> Self {
        Self::default()
    }
}

impl fmt::Display for CpuFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.avx2 {
            write!(f, " AVX2")?;
        }
        if self.avx {
            write!(f, " AVX")?;
        }
        if self.sse41 {
            write!(f, " SSE4.1")?;
        }
        if self.fma {
            write!(f, " FMA3")?;
        }
        if cfg!(any(target_arch = "x86", target_arch = "x86_64")) {
            write!(f, " SSE2")?;
        }
        Ok(())
    }
}

/// Logs the detected capabilities and the pointer width. Called once by hosts at startup.
pub fn log_capabilities() {
    let bits = if cfg!(target_pointer_width = "64") {
        "64-bit"
    } else if cfg!(target_pointer_width = "32") {
        "32-bit"
    } else {
        "Unknown Arch"
    };

    log::info!("Registered v{} {}", env!("CARGO_PKG_VERSION"), bits);
    log::info!("Using CPU capabilities:{}", CpuFeatures::current());
}
