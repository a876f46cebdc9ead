//! [`Driver`] implementation on top of `ash`.

use crate::capabilities::DeviceInfo;
use crate::debug::{DiagnosticRecord, DiagnosticSink};
use crate::driver::{
    DeviceRequest, Driver, ImageViewRequest, InstanceRequest, MessengerRequest, SwapchainRequest,
};
use crate::error::{GpuError, Result};
use ash::prelude::VkResult;
use ash::vk;
use parking_lot::Mutex;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::borrow::Cow;
use std::ffi::{c_char, c_void, CStr, CString};
use std::sync::Arc;

/// Instance-level function tables.
struct InstanceFns {
    instance: ash::Instance,
    surface: ash::khr::surface::Instance,
    debug_utils: ash::ext::debug_utils::Instance,
}

/// Device-level function tables.
struct DeviceFns {
    device: ash::Device,
    swapchain: ash::khr::swapchain::Device,
}

/// A sink registered with a messenger. Boxed so the address handed to the
/// driver as user data stays fixed.
type SinkSlot = Box<Arc<dyn DiagnosticSink>>;

/// Vulkan driver loaded through the system loader.
pub struct AshDriver {
    entry: ash::Entry,
    instance: Mutex<Option<InstanceFns>>,
    device: Mutex<Option<DeviceFns>>,
    sinks: Mutex<Vec<(vk::DebugUtilsMessengerEXT, SinkSlot)>>,
}

impl AshDriver {
    /// Load the Vulkan loader library.
    pub fn load() -> Result<Self> {
        // SAFETY: the loader is only used through this driver, which keeps
        // the entry alive for as long as any handle exists.
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::ContextCreation(format!("Failed to load Vulkan: {e}")))?;

        Ok(Self {
            entry,
            instance: Mutex::new(None),
            device: Mutex::new(None),
            sinks: Mutex::new(Vec::new()),
        })
    }
}

fn names_to_ptrs(names: &[CString]) -> Vec<*const c_char> {
    names.iter().map(|name| name.as_ptr()).collect()
}

/// Messenger callback. `user_data` points at the [`SinkSlot`] registered
/// with the messenger.
unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    category: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if user_data.is_null() {
        return vk::FALSE;
    }

    let message = if callback_data.is_null() || unsafe { (*callback_data).p_message.is_null() } {
        Cow::from("")
    } else {
        unsafe { CStr::from_ptr((*callback_data).p_message) }.to_string_lossy()
    };

    let sink = unsafe { &*(user_data as *const Arc<dyn DiagnosticSink>) };
    sink.record(&DiagnosticRecord::new(severity, category, message));

    vk::FALSE
}

impl Driver for AshDriver {
    fn instance_layer_names(&self) -> VkResult<Vec<CString>> {
        let layers = unsafe { self.entry.enumerate_instance_layer_properties()? };

        Ok(layers
            .iter()
            .filter_map(|props| props.layer_name_as_c_str().ok())
            .map(CStr::to_owned)
            .collect())
    }

    fn create_instance(&self, request: &InstanceRequest) -> VkResult<vk::Instance> {
        let mut slot = self.instance.lock();
        if slot.is_some() {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(&request.app_name)
            .application_version(request.app_version)
            .engine_name(&request.engine_name)
            .engine_version(request.engine_version)
            .api_version(request.api_version);

        let extension_names = names_to_ptrs(&request.extensions);
        let layer_names = names_to_ptrs(&request.layers);

        // Required for MoltenVK on macOS
        #[cfg(target_os = "macos")]
        let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        #[cfg(not(target_os = "macos"))]
        let create_flags = vk::InstanceCreateFlags::empty();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names)
            .flags(create_flags);

        let instance = unsafe { self.entry.create_instance(&create_info, None)? };
        let handle = instance.handle();

        *slot = Some(InstanceFns {
            surface: ash::khr::surface::Instance::new(&self.entry, &instance),
            debug_utils: ash::ext::debug_utils::Instance::new(&self.entry, &instance),
            instance,
        });

        Ok(handle)
    }

    unsafe fn destroy_instance(&self, instance: vk::Instance) {
        let mut slot = self.instance.lock();
        if instance_fns(slot.as_ref(), instance).is_err() {
            return;
        }
        if let Some(fns) = slot.take() {
            unsafe { fns.instance.destroy_instance(None) };
        }
    }

    unsafe fn create_debug_messenger(
        &self,
        instance: vk::Instance,
        request: &MessengerRequest,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let slot = self.instance.lock();
        let fns = instance_fns(slot.as_ref(), instance)?;

        let sink: SinkSlot = Box::new(request.sink.clone());
        let user_data = std::ptr::from_ref::<Arc<dyn DiagnosticSink>>(&*sink)
            .cast_mut()
            .cast::<c_void>();

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(request.severities)
            .message_type(request.categories)
            .pfn_user_callback(Some(debug_callback))
            .user_data(user_data);

        let messenger = unsafe {
            fns.debug_utils
                .create_debug_utils_messenger(&create_info, None)?
        };
        self.sinks.lock().push((messenger, sink));

        Ok(messenger)
    }

    unsafe fn destroy_debug_messenger(
        &self,
        instance: vk::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    ) {
        let slot = self.instance.lock();
        if let Ok(fns) = instance_fns(slot.as_ref(), instance) {
            unsafe {
                fns.debug_utils
                    .destroy_debug_utils_messenger(messenger, None);
            }
        }
        // The sink may only go once the driver can no longer call it.
        self.sinks.lock().retain(|(handle, _)| *handle != messenger);
    }

    unsafe fn create_surface(
        &self,
        instance: vk::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> VkResult<vk::SurfaceKHR> {
        let slot = self.instance.lock();
        let fns = instance_fns(slot.as_ref(), instance)?;
        unsafe { ash_window::create_surface(&self.entry, &fns.instance, display, window, None) }
    }

    unsafe fn destroy_surface(&self, instance: vk::Instance, surface: vk::SurfaceKHR) {
        let slot = self.instance.lock();
        if let Ok(fns) = instance_fns(slot.as_ref(), instance) {
            unsafe { fns.surface.destroy_surface(surface, None) };
        }
    }

    unsafe fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
    ) -> VkResult<Vec<vk::PhysicalDevice>> {
        let slot = self.instance.lock();
        let fns = instance_fns(slot.as_ref(), instance)?;
        unsafe { fns.instance.enumerate_physical_devices() }
    }

    unsafe fn device_info(&self, physical_device: vk::PhysicalDevice) -> VkResult<DeviceInfo> {
        let slot = self.instance.lock();
        let fns = slot
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        let properties = unsafe { fns.instance.get_physical_device_properties(physical_device) };
        Ok(DeviceInfo::from_properties(&properties))
    }

    unsafe fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        let slot = self.instance.lock();
        let fns = slot
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        Ok(unsafe {
            fns.instance
                .get_physical_device_queue_family_properties(physical_device)
        })
    }

    unsafe fn device_extension_names(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<Vec<CString>> {
        let slot = self.instance.lock();
        let fns = slot
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        let extensions = unsafe {
            fns.instance
                .enumerate_device_extension_properties(physical_device)?
        };

        Ok(extensions
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok())
            .map(CStr::to_owned)
            .collect())
    }

    unsafe fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let slot = self.instance.lock();
        let fns = slot
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        unsafe {
            fns.surface
                .get_physical_device_surface_support(physical_device, family, surface)
        }
    }

    unsafe fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        let slot = self.instance.lock();
        let fns = slot
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        unsafe {
            fns.surface
                .get_physical_device_surface_capabilities(physical_device, surface)
        }
    }

    unsafe fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        let slot = self.instance.lock();
        let fns = slot
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        unsafe {
            fns.surface
                .get_physical_device_surface_formats(physical_device, surface)
        }
    }

    unsafe fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        let slot = self.instance.lock();
        let fns = slot
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        unsafe {
            fns.surface
                .get_physical_device_surface_present_modes(physical_device, surface)
        }
    }

    unsafe fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        request: &DeviceRequest,
    ) -> VkResult<vk::Device> {
        let instance_slot = self.instance.lock();
        let fns = instance_slot
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;

        let mut device_slot = self.device.lock();
        if device_slot.is_some() {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = request
            .queues
            .iter()
            .map(|queue| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(queue.family)
                    .queue_priorities(std::slice::from_ref(&queue.priority))
            })
            .collect();

        let extension_names = names_to_ptrs(&request.extensions);

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names);

        let device = unsafe {
            fns.instance
                .create_device(physical_device, &device_create_info, None)?
        };
        let handle = device.handle();

        *device_slot = Some(DeviceFns {
            swapchain: ash::khr::swapchain::Device::new(&fns.instance, &device),
            device,
        });

        Ok(handle)
    }

    unsafe fn device_queue(&self, device: vk::Device, family: u32, index: u32) -> vk::Queue {
        let slot = self.device.lock();
        match device_fns(slot.as_ref(), device) {
            Ok(fns) => unsafe { fns.device.get_device_queue(family, index) },
            Err(_) => vk::Queue::null(),
        }
    }

    unsafe fn device_wait_idle(&self, device: vk::Device) -> VkResult<()> {
        let slot = self.device.lock();
        let fns = device_fns(slot.as_ref(), device)?;
        unsafe { fns.device.device_wait_idle() }
    }

    unsafe fn destroy_device(&self, device: vk::Device) {
        let mut slot = self.device.lock();
        if device_fns(slot.as_ref(), device).is_err() {
            return;
        }
        if let Some(fns) = slot.take() {
            unsafe { fns.device.destroy_device(None) };
        }
    }

    unsafe fn create_swapchain(
        &self,
        device: vk::Device,
        request: &SwapchainRequest,
    ) -> VkResult<vk::SwapchainKHR> {
        let slot = self.device.lock();
        let fns = device_fns(slot.as_ref(), device)?;

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(request.surface)
            .min_image_count(request.min_image_count)
            .image_format(request.format)
            .image_color_space(request.color_space)
            .image_extent(request.extent)
            .image_array_layers(1)
            .image_usage(request.usage)
            .image_sharing_mode(request.sharing.vk_mode())
            .queue_family_indices(request.sharing.family_indices())
            .pre_transform(request.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(request.present_mode)
            .clipped(true);

        unsafe { fns.swapchain.create_swapchain(&create_info, None) }
    }

    unsafe fn swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
    ) -> VkResult<Vec<vk::Image>> {
        let slot = self.device.lock();
        let fns = device_fns(slot.as_ref(), device)?;
        unsafe { fns.swapchain.get_swapchain_images(swapchain) }
    }

    unsafe fn destroy_swapchain(&self, device: vk::Device, swapchain: vk::SwapchainKHR) {
        let slot = self.device.lock();
        if let Ok(fns) = device_fns(slot.as_ref(), device) {
            unsafe { fns.swapchain.destroy_swapchain(swapchain, None) };
        }
    }

    unsafe fn create_image_view(
        &self,
        device: vk::Device,
        request: &ImageViewRequest,
    ) -> VkResult<vk::ImageView> {
        let slot = self.device.lock();
        let fns = device_fns(slot.as_ref(), device)?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(request.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(request.format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        unsafe { fns.device.create_image_view(&view_info, None) }
    }

    unsafe fn destroy_image_view(&self, device: vk::Device, view: vk::ImageView) {
        let slot = self.device.lock();
        if let Ok(fns) = device_fns(slot.as_ref(), device) {
            unsafe { fns.device.destroy_image_view(view, None) };
        }
    }
}

fn instance_fns(slot: Option<&InstanceFns>, instance: vk::Instance) -> VkResult<&InstanceFns> {
    slot.filter(|fns| fns.instance.handle() == instance)
        .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
}

fn device_fns(slot: Option<&DeviceFns>, device: vk::Device) -> VkResult<&DeviceFns> {
    slot.filter(|fns| fns.device.handle() == device)
        .ok_or(vk::Result::ERROR_DEVICE_LOST)
}
