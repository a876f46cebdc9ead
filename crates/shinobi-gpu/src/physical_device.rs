//! Physical device and queue family selection.

use crate::capabilities::DeviceInfo;
use crate::context::{contains_name, GraphicsContext};
use crate::driver::Driver;
use crate::error::{GpuError, Result};
use crate::surface::PresentationSurface;
use ash::vk;
use std::ffi::CString;
use std::fmt;

/// Queue family indices chosen on one physical device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilySelection {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
    pub transfer: Option<u32>,
}

impl QueueFamilySelection {
    /// Distinct family indices in role order (graphics, present, transfer).
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(3);
        for family in [self.graphics, self.present, self.transfer]
            .into_iter()
            .flatten()
        {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }
}

/// Scan queue families in index order and record the first family that
/// fills each role.
///
/// `supports_present` is asked about each family index until a presenting
/// family is found. One family may fill several roles.
pub fn probe_queue_families<F>(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: F,
) -> Result<QueueFamilySelection>
where
    F: FnMut(u32) -> Result<bool>,
{
    let mut selection = QueueFamilySelection::default();

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;
        let has_queues = family.queue_count > 0;

        if has_queues
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            && selection.graphics.is_none()
        {
            selection.graphics = Some(index);
        }

        if has_queues
            && family.queue_flags.contains(vk::QueueFlags::TRANSFER)
            && selection.transfer.is_none()
        {
            selection.transfer = Some(index);
        }

        if selection.present.is_none() && supports_present(index)? {
            selection.present = Some(index);
        }
    }

    Ok(selection)
}

/// What a device must offer to be accepted.
#[derive(Debug, Clone)]
pub struct DeviceRequirements {
    /// Require a queue family that can present to the surface.
    pub present: bool,
    /// Minimum Vulkan API version the device must report.
    pub min_api_version: u32,
    /// Device extensions that must be supported and will be enabled.
    pub extensions: Vec<CString>,
}

impl Default for DeviceRequirements {
    fn default() -> Self {
        Self {
            present: true,
            min_api_version: vk::API_VERSION_1_1,
            extensions: vec![ash::khr::swapchain::NAME.to_owned()],
        }
    }
}

impl DeviceRequirements {
    /// Whether a presenting queue family is mandatory.
    pub fn with_present(mut self, present: bool) -> Self {
        self.present = present;
        self
    }

    /// Set the minimum API version.
    pub fn with_min_api_version(mut self, version: u32) -> Self {
        self.min_api_version = version;
        self
    }

    /// Replace the required device extensions.
    pub fn with_extensions(mut self, extensions: Vec<CString>) -> Self {
        self.extensions = extensions;
        self
    }
}

/// A physical device under consideration. Not owned; valid while the
/// instance lives.
#[derive(Debug, Clone)]
pub struct PhysicalDeviceCandidate {
    pub handle: vk::PhysicalDevice,
    pub info: DeviceInfo,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
}

impl PhysicalDeviceCandidate {
    /// Query identity and queue families.
    ///
    /// # Safety
    /// The physical device must come from a live instance of this driver.
    pub unsafe fn query(driver: &dyn Driver, handle: vk::PhysicalDevice) -> Result<Self> {
        unsafe {
            Ok(Self {
                handle,
                info: driver.device_info(handle)?,
                queue_families: driver.queue_families(handle)?,
            })
        }
    }
}

/// Why a candidate was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rejection {
    NoGraphicsFamily,
    NoPresentFamily,
    ApiVersion(u32),
    MissingExtensions(Vec<CString>),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoGraphicsFamily => {
                write!(f, "no queue family with required capability graphics")
            }
            Self::NoPresentFamily => {
                write!(f, "no queue family with required capability presentation")
            }
            Self::ApiVersion(version) => write!(
                f,
                "supports Vulkan {}.{} only",
                vk::api_version_major(*version),
                vk::api_version_minor(*version)
            ),
            Self::MissingExtensions(names) => {
                write!(f, "missing device extensions {}", crate::context::join_names(names))
            }
        }
    }
}

fn check_candidate(
    driver: &dyn Driver,
    candidate: &PhysicalDeviceCandidate,
    selection: &QueueFamilySelection,
    requirements: &DeviceRequirements,
) -> Result<Option<Rejection>> {
    if selection.graphics.is_none() {
        return Ok(Some(Rejection::NoGraphicsFamily));
    }
    if requirements.present && selection.present.is_none() {
        return Ok(Some(Rejection::NoPresentFamily));
    }
    if candidate.info.api_version < requirements.min_api_version {
        return Ok(Some(Rejection::ApiVersion(candidate.info.api_version)));
    }

    if !requirements.extensions.is_empty() {
        // SAFETY: the candidate was enumerated from the live instance.
        let available = unsafe { driver.device_extension_names(candidate.handle)? };
        let missing: Vec<CString> = requirements
            .extensions
            .iter()
            .filter(|name| !contains_name(&available, name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Ok(Some(Rejection::MissingExtensions(missing)));
        }
    }

    Ok(None)
}

/// Pick the physical device and queue families to use.
///
/// Every enumerated device is probed. Among the accepted ones the best
/// device type wins (discrete over integrated over virtual over CPU); ties
/// go to the device enumerated first.
pub fn select_device(
    context: &GraphicsContext,
    surface: &PresentationSurface,
    requirements: &DeviceRequirements,
) -> Result<(PhysicalDeviceCandidate, QueueFamilySelection)> {
    let driver = context.driver().as_ref();

    // SAFETY: the instance is alive for the duration of the borrow.
    let handles = unsafe { driver.enumerate_physical_devices(context.instance())? };
    if handles.is_empty() {
        return Err(GpuError::NoDevice);
    }

    let mut best: Option<(PhysicalDeviceCandidate, QueueFamilySelection)> = None;
    let mut rejections = Vec::new();

    for handle in handles {
        // SAFETY: enumerated from the live instance.
        let candidate = unsafe { PhysicalDeviceCandidate::query(driver, handle)? };

        let selection = probe_queue_families(&candidate.queue_families, |family| {
            // SAFETY: the surface lives on the same instance as the device.
            let supported = unsafe { driver.surface_support(handle, family, surface.handle())? };
            Ok(supported)
        })?;

        tracing::debug!(
            "{}: graphics {:?}, present {:?}, transfer {:?}",
            candidate.info.name,
            selection.graphics,
            selection.present,
            selection.transfer
        );

        if let Some(rejection) = check_candidate(driver, &candidate, &selection, requirements)? {
            tracing::debug!("Rejected {}: {rejection}", candidate.info.name);
            rejections.push(format!("{}: {rejection}", candidate.info.name));
            continue;
        }

        let better = best.as_ref().map_or(true, |(current, _)| {
            candidate.info.type_rank() > current.info.type_rank()
        });
        if better {
            best = Some((candidate, selection));
        }
    }

    let (candidate, selection) =
        best.ok_or_else(|| GpuError::NoSuitableDevice(rejections.join("; ")))?;

    tracing::info!("Selected GPU: {}", candidate.info.summary());

    Ok((candidate, selection))
}
