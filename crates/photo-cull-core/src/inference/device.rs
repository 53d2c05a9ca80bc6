//! Device selection for Candle inference.

use candle_core::Device;
use tracing::info;

/// Returns the best available device, falling back to CPU.
///
/// GPU backends are only tried when the crate is built with the `metal` or
/// `cuda` feature.
#[must_use]
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal device for inference");
                return device;
            }
            Err(e) => tracing::debug!(error = %e, "Metal device unavailable"),
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Using CUDA device for inference");
                return device;
            }
            Err(e) => tracing::debug!(error = %e, "CUDA device unavailable"),
        }
    }

    info!("Using CPU for inference");
    Device::Cpu
}

/// Short human-readable name of a device.
#[must_use]
pub fn describe_device(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}
