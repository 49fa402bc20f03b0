use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Environment variable that replaces hardware probing.
///
/// Comma-separated list of `cuda`, `rocm`, `npu`, `amx`, or `none`.
/// For example `IR_HW_OVERRIDE=rocm` forces the ROCm kernels for tests.
pub const OVERRIDE_ENV: &str = "IR_HW_OVERRIDE";

/// Which fused-kernel families the process can use.
///
/// Computed once at startup and never mutated afterwards; every activation
/// branches on the same snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareProfile {
    /// NVIDIA GPU with the CUDA fused activation kernels.
    pub has_cuda_fused_ops: bool,
    /// AMD GPU with the HIP/ROCm fused activation kernels.
    pub has_rocm_fused_ops: bool,
    /// Ascend NPU with its native swiglu kernel.
    pub has_npu_ops: bool,
    /// x86 CPU exposing the AMX tile extension.
    pub has_cpu_amx: bool,
}

impl HardwareProfile {
    /// A profile with no fused kernels at all.
    pub const NONE: HardwareProfile = HardwareProfile {
        has_cuda_fused_ops: false,
        has_rocm_fused_ops: false,
        has_npu_ops: false,
        has_cpu_amx: false,
    };

    /// Detect the profile, honouring [`OVERRIDE_ENV`] when it is set.
    pub fn detect() -> Self {
        match std::env::var(OVERRIDE_ENV) {
            Ok(spec) => {
                let profile = Self::from_override(&spec);
                log::debug!("hardware profile from {}={:?}: {}", OVERRIDE_ENV, spec, profile);
                profile
            }
            Err(_) => {
                let profile = Self::probe();
                log::debug!("probed hardware profile: {}", profile);
                profile
            }
        }
    }

    /// Process-wide snapshot, detected on first use.
    ///
    /// Prefer passing a profile explicitly; this exists for the process
    /// entry point that builds the registry.
    pub fn global() -> &'static HardwareProfile {
        static PROFILE: OnceLock<HardwareProfile> = OnceLock::new();
        PROFILE.get_or_init(Self::detect)
    }

    /// Probe the machine for each kernel family.
    pub fn probe() -> Self {
        HardwareProfile {
            has_cuda_fused_ops: cuda_present(),
            has_rocm_fused_ops: rocm_present(),
            has_npu_ops: Path::new("/dev/davinci_manager").exists(),
            has_cpu_amx: cpu_has_amx(),
        }
    }

    /// Parse an override list such as `"cuda"` or `"npu,amx"`.
    ///
    /// Unknown tokens are logged and ignored. `none` clears everything
    /// listed before it.
    pub fn from_override(spec: &str) -> Self {
        let mut profile = HardwareProfile::NONE;
        for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.to_ascii_lowercase().as_str() {
                "cuda" => profile.has_cuda_fused_ops = true,
                "rocm" | "hip" => profile.has_rocm_fused_ops = true,
                "npu" => profile.has_npu_ops = true,
                "amx" => profile.has_cpu_amx = true,
                "none" => profile = HardwareProfile::NONE,
                other => log::warn!("ignoring unknown {} token {:?}", OVERRIDE_ENV, other),
            }
        }
        profile
    }

    /// True if any fused-kernel family is usable.
    pub fn has_fused_kernels(&self) -> bool {
        self.has_cuda_fused_ops || self.has_rocm_fused_ops || self.has_npu_ops || self.has_cpu_amx
    }
}

impl fmt::Display for HardwareProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cuda={} rocm={} npu={} amx={}",
            self.has_cuda_fused_ops, self.has_rocm_fused_ops, self.has_npu_ops, self.has_cpu_amx
        )
    }
}

fn cuda_present() -> bool {
    if let Ok(devices) = std::env::var("CUDA_VISIBLE_DEVICES") {
        let devices = devices.trim();
        if devices.is_empty() || devices == "-1" {
            return false;
        }
    }
    Path::new("/dev/nvidiactl").exists()
}

fn rocm_present() -> bool {
    Path::new("/dev/kfd").exists()
}

#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
fn cpu_has_amx() -> bool {
    std::fs::read_to_string("/proc/cpuinfo")
        .map(|info| cpuinfo_has_amx(&info))
        .unwrap_or(false)
}

#[cfg(not(all(target_arch = "x86_64", target_os = "linux")))]
fn cpu_has_amx() -> bool {
    false
}

/// Looks for the `amx_tile` flag on any `flags` line of `/proc/cpuinfo`.
#[cfg_attr(not(all(target_arch = "x86_64", target_os = "linux")), allow(dead_code))]
fn cpuinfo_has_amx(cpuinfo: &str) -> bool {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("flags"))
        .filter_map(|line| line.split_once(':'))
        .any(|(_, flags)| flags.split_whitespace().any(|f| f == "amx_tile"))
}
