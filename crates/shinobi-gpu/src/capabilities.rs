//! Capability probing: layers, instance extensions and device identity.

use crate::driver::Driver;
use crate::error::Result;
use ash::vk;
use std::collections::BTreeSet;
use std::ffi::CString;

/// Validation layers enabled when diagnostics are requested.
pub fn validation_layers() -> Vec<CString> {
    vec![c"VK_LAYER_KHRONOS_validation".to_owned()]
}

/// Instance extensions needed for a context.
///
/// `platform` is the list the window system requires for its surface type.
/// The generic surface extension is always added; the debug utilities
/// extension only when diagnostics are enabled.
pub fn required_instance_extensions(platform: &[CString], diagnostics: bool) -> BTreeSet<CString> {
    let mut extensions: BTreeSet<CString> = platform.iter().cloned().collect();
    extensions.insert(ash::khr::surface::NAME.to_owned());

    if diagnostics {
        extensions.insert(ash::ext::debug_utils::NAME.to_owned());
    }

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    extensions.insert(ash::khr::portability_enumeration::NAME.to_owned());

    extensions
}

/// Requested layers the driver does not offer.
pub fn missing_layers(driver: &dyn Driver, requested: &[CString]) -> Result<Vec<CString>> {
    let available: BTreeSet<CString> = driver.instance_layer_names()?.into_iter().collect();

    Ok(requested
        .iter()
        .filter(|layer| !available.contains(*layer))
        .cloned()
        .collect())
}

/// Whether every requested layer can be enabled.
pub fn has_layer_support(driver: &dyn Driver, requested: &[CString]) -> Result<bool> {
    Ok(missing_layers(driver, requested)?.is_empty())
}

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Reported identity of a physical device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device name
    pub name: String,
    /// GPU vendor
    pub vendor: GpuVendor,
    /// Discrete, integrated, virtual, CPU or other
    pub device_type: vk::PhysicalDeviceType,
    /// Highest Vulkan API version supported
    pub api_version: u32,
    /// Driver version
    pub driver_version: u32,
}

impl DeviceInfo {
    /// Read the identity out of raw device properties.
    pub fn from_properties(properties: &vk::PhysicalDeviceProperties) -> Self {
        let name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            name,
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_type: properties.device_type,
            api_version: properties.api_version,
            driver_version: properties.driver_version,
        }
    }

    /// Preference order between device types; higher wins.
    pub fn type_rank(&self) -> u8 {
        match self.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 4,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
            vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
            vk::PhysicalDeviceType::CPU => 1,
            _ => 0,
        }
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{}",
            self.name,
            self.vendor,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
        )
    }
}
