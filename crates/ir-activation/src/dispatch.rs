use std::fmt;
use std::sync::Arc;

use ir_tensor::{ComputeBackend, CpuBackend};

use crate::hardware::HardwareProfile;
use crate::kernels::{FallbackKernels, FusedKernels, HostFusedKernels, ReferenceFallback};

/// The kernel family every activation in the process dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelPath {
    /// NVIDIA fused kernels.
    Cuda,
    /// AMD fused kernels, including quick GELU.
    Rocm,
    /// Ascend NPU; only the gated SiLU has a native kernel.
    Npu,
    /// AMX-capable CPU; only the gated SiLU has a native kernel.
    CpuAmx,
    /// No fused kernels anywhere. Gated activations go to the external
    /// fallback library.
    Portable,
}

impl KernelPath {
    /// Pick the path for a profile. The first family present wins, in the
    /// order CUDA, ROCm, NPU, AMX.
    pub fn select(profile: &HardwareProfile) -> Self {
        if profile.has_cuda_fused_ops {
            KernelPath::Cuda
        } else if profile.has_rocm_fused_ops {
            KernelPath::Rocm
        } else if profile.has_npu_ops {
            KernelPath::Npu
        } else if profile.has_cpu_amx {
            KernelPath::CpuAmx
        } else {
            KernelPath::Portable
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KernelPath::Cuda => "cuda",
            KernelPath::Rocm => "rocm",
            KernelPath::Npu => "npu",
            KernelPath::CpuAmx => "cpu-amx",
            KernelPath::Portable => "portable",
        }
    }
}

impl fmt::Display for KernelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kernel path plus the providers each route calls into.
///
/// Built once per process (or per model) and shared by every activation
/// through an `Arc`. Nothing here changes after construction.
#[derive(Debug, Clone)]
pub struct KernelDispatch {
    path: KernelPath,
    backend: Arc<dyn ComputeBackend>,
    fused: Arc<dyn FusedKernels>,
    fallback: Arc<dyn FallbackKernels>,
}

impl KernelDispatch {
    /// Dispatch for `profile` using the host kernel implementations.
    pub fn new(profile: &HardwareProfile) -> Self {
        let backend: Arc<dyn ComputeBackend> = Arc::new(CpuBackend::new());
        let fallback = Arc::new(ReferenceFallback::new(backend.clone()));
        Self::with_providers(profile, backend, Arc::new(HostFusedKernels::new()), fallback)
    }

    /// Dispatch for `profile` with explicit providers.
    pub fn with_providers(
        profile: &HardwareProfile,
        backend: Arc<dyn ComputeBackend>,
        fused: Arc<dyn FusedKernels>,
        fallback: Arc<dyn FallbackKernels>,
    ) -> Self {
        let path = KernelPath::select(profile);
        log::debug!("activation kernel path: {} ({})", path, profile);
        if path == KernelPath::Portable {
            log::info!(
                "no fused activation kernels on this platform (no CUDA, ROCm, NPU or AMX); falling back to the {} kernel library",
                fallback.name()
            );
        } else {
            log::debug!("fused activation kernels provided by {}", fused.name());
        }
        KernelDispatch {
            path,
            backend,
            fused,
            fallback,
        }
    }

    pub fn path(&self) -> KernelPath {
        self.path
    }

    pub fn backend(&self) -> &dyn ComputeBackend {
        self.backend.as_ref()
    }

    pub fn fused(&self) -> &dyn FusedKernels {
        self.fused.as_ref()
    }

    pub fn fallback(&self) -> &dyn FallbackKernels {
        self.fallback.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_priority() {
        let all = HardwareProfile::from_override("cuda,rocm,npu,amx");
        assert_eq!(KernelPath::select(&all), KernelPath::Cuda);
        let amd_amx = HardwareProfile::from_override("rocm,amx");
        assert_eq!(KernelPath::select(&amd_amx), KernelPath::Rocm);
        let npu_amx = HardwareProfile::from_override("npu,amx");
        assert_eq!(KernelPath::select(&npu_amx), KernelPath::Npu);
        let amx = HardwareProfile::from_override("amx");
        assert_eq!(KernelPath::select(&amx), KernelPath::CpuAmx);
    }

    #[test]
    fn test_portable_iff_no_fused_kernels() {
        for spec in ["", "cuda", "rocm", "npu", "amx", "cuda,amx", "none"] {
            let profile = HardwareProfile::from_override(spec);
            let portable = KernelPath::select(&profile) == KernelPath::Portable;
            assert_eq!(portable, !profile.has_fused_kernels(), "profile {:?}", spec);
        }
    }

    #[test]
    fn test_default_providers() {
        let d = KernelDispatch::new(&HardwareProfile::NONE);
        assert_eq!(d.path(), KernelPath::Portable);
        assert_eq!(d.backend().name(), "cpu");
        assert_eq!(d.fused().name(), "host-fused");
        assert_eq!(d.fallback().name(), "reference");
    }
}
