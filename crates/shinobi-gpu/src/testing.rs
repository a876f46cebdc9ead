//! Recording driver double for unit tests.

use crate::capabilities::{DeviceInfo, GpuVendor};
use crate::context::GraphicsContext;
use crate::debug::{DiagnosticRecord, DiagnosticSink};
use crate::driver::{
    DeviceRequest, Driver, ImageViewRequest, InstanceRequest, MessengerRequest, SwapchainRequest,
};
use crate::error::Result;
use crate::surface::PresentationSurface;
use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::Mutex;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle};
use std::ffi::CString;

const INSTANCE: u64 = 0x1;
const MESSENGER: u64 = 0x2;
const SURFACE: u64 = 0x3;
const SWAPCHAIN: u64 = 0x4;
const DEVICE: u64 = 0x10;
const PHYSICAL_DEVICE_BASE: u64 = 0x100;
const QUEUE_BASE: u64 = 0x200;
const IMAGE_BASE: u64 = 0x300;
const VIEW_BASE: u64 = 0x400;

/// Creation and destruction calls, in the order the driver saw them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    CreateInstance,
    DestroyInstance,
    CreateDebugMessenger,
    DestroyDebugMessenger,
    CreateSurface,
    DestroySurface,
    CreateDevice,
    DeviceWaitIdle,
    DestroyDevice,
    CreateSwapchain,
    DestroySwapchain,
    CreateImageView(usize),
    DestroyImageView(usize),
}

/// A queue family with the given capabilities.
pub fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: count,
        ..Default::default()
    }
}

/// A synthetic physical device.
#[derive(Debug, Clone)]
pub struct FakeGpu {
    name: String,
    device_type: vk::PhysicalDeviceType,
    api_version: u32,
    families: Vec<vk::QueueFamilyProperties>,
    present_families: Vec<u32>,
    extensions: Vec<CString>,
    capabilities: vk::SurfaceCapabilitiesKHR,
    formats: Vec<vk::SurfaceFormatKHR>,
    present_modes: Vec<vk::PresentModeKHR>,
    image_count: Option<u32>,
}

impl FakeGpu {
    fn new(name: &str, device_type: vk::PhysicalDeviceType) -> Self {
        Self {
            name: name.to_string(),
            device_type,
            api_version: vk::API_VERSION_1_3,
            families: vec![family(
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                4,
            )],
            present_families: vec![0],
            extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 900,
                    height: 600,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            image_count: None,
        }
    }

    pub fn discrete(name: &str) -> Self {
        Self::new(name, vk::PhysicalDeviceType::DISCRETE_GPU)
    }

    pub fn integrated(name: &str) -> Self {
        Self::new(name, vk::PhysicalDeviceType::INTEGRATED_GPU)
    }

    pub fn with_families(mut self, families: Vec<vk::QueueFamilyProperties>) -> Self {
        self.families = families;
        self
    }

    /// Family indices that report presentation support.
    pub fn with_present_families(mut self, families: Vec<u32>) -> Self {
        self.present_families = families;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<CString>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    pub fn with_present_modes(mut self, modes: Vec<vk::PresentModeKHR>) -> Self {
        self.present_modes = modes;
        self
    }

    pub fn with_image_limits(mut self, min: u32, max: u32) -> Self {
        self.capabilities.min_image_count = min;
        self.capabilities.max_image_count = max;
        self
    }

    /// Number of images the swapchain reports, regardless of the request.
    pub fn with_image_count(mut self, count: u32) -> Self {
        self.image_count = Some(count);
        self
    }
}

#[derive(Default)]
pub struct FakeState {
    calls: Vec<Call>,
    fail_instance: bool,
    fail_messenger: bool,
    fail_device: bool,
    fail_device_query: bool,
    fail_swapchain: bool,
    fail_swapchain_images: bool,
    fail_image_view: Option<usize>,
    dropped_queues: Vec<u32>,
    instance_request: Option<InstanceRequest>,
    messenger: Option<MessengerRequest>,
    device_gpu: Option<usize>,
    device_request: Option<DeviceRequest>,
    swapchain_request: Option<SwapchainRequest>,
    views_created: usize,
}

/// Driver double that records calls and serves synthetic devices.
pub struct FakeDriver {
    pub layers: Vec<CString>,
    pub gpus: Vec<FakeGpu>,
    pub state: Mutex<FakeState>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::with_gpus(vec![FakeGpu::discrete("Fake GPU")])
    }
}

impl FakeDriver {
    pub fn with_gpus(gpus: Vec<FakeGpu>) -> Self {
        Self {
            layers: vec![
                c"VK_LAYER_KHRONOS_validation".to_owned(),
                c"VK_LAYER_MESA_device_select".to_owned(),
            ],
            gpus,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn instance_handle(&self) -> vk::Instance {
        vk::Instance::from_raw(INSTANCE)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn fail_instance(&self) {
        self.state.lock().fail_instance = true;
    }

    pub fn fail_messenger(&self) {
        self.state.lock().fail_messenger = true;
    }

    pub fn fail_device(&self) {
        self.state.lock().fail_device = true;
    }

    /// Fail property and queue family queries on every physical device.
    pub fn fail_device_query(&self) {
        self.state.lock().fail_device_query = true;
    }

    pub fn fail_swapchain(&self) {
        self.state.lock().fail_swapchain = true;
    }

    pub fn fail_swapchain_images(&self) {
        self.state.lock().fail_swapchain_images = true;
    }

    /// Fail the image view created at position `index`.
    pub fn fail_image_view(&self, index: usize) {
        self.state.lock().fail_image_view = Some(index);
    }

    /// Return a null queue for this family.
    pub fn drop_queue(&self, family: u32) {
        self.state.lock().dropped_queues.push(family);
    }

    pub fn last_instance_request(&self) -> Option<InstanceRequest> {
        self.state.lock().instance_request.clone()
    }

    pub fn last_device_request(&self) -> Option<DeviceRequest> {
        self.state.lock().device_request.clone()
    }

    pub fn last_swapchain_request(&self) -> Option<SwapchainRequest> {
        self.state.lock().swapchain_request
    }

    pub fn messenger_filters(
        &self,
    ) -> Option<(
        vk::DebugUtilsMessageSeverityFlagsEXT,
        vk::DebugUtilsMessageTypeFlagsEXT,
    )> {
        self.state
            .lock()
            .messenger
            .as_ref()
            .map(|request| (request.severities, request.categories))
    }

    /// Deliver a record to the registered sink, as the validation layer would.
    pub fn emit(&self, record: &DiagnosticRecord) {
        let sink = self
            .state
            .lock()
            .messenger
            .as_ref()
            .map(|request| request.sink.clone());
        if let Some(sink) = sink {
            sink.record(record);
        }
    }

    fn log_call(&self, call: Call) {
        self.state.lock().calls.push(call);
    }

    fn gpu(&self, physical_device: vk::PhysicalDevice) -> &FakeGpu {
        &self.gpus[(physical_device.as_raw() - PHYSICAL_DEVICE_BASE) as usize]
    }

    fn device_gpu(&self) -> &FakeGpu {
        let index = self.state.lock().device_gpu.unwrap_or_default();
        &self.gpus[index]
    }
}

/// Surface over a made-up Xlib window.
pub fn fake_surface(context: &GraphicsContext) -> Result<PresentationSurface> {
    let display = RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0));
    let window = RawWindowHandle::Xlib(XlibWindowHandle::new(1));
    // SAFETY: the fake driver never dereferences window handles.
    unsafe { PresentationSurface::from_raw_handles(context, display, window) }
}

pub fn surface_for(context: &GraphicsContext) -> PresentationSurface {
    fake_surface(context).unwrap()
}

impl Driver for FakeDriver {
    fn instance_layer_names(&self) -> VkResult<Vec<CString>> {
        Ok(self.layers.clone())
    }

    fn create_instance(&self, request: &InstanceRequest) -> VkResult<vk::Instance> {
        let mut state = self.state.lock();
        if state.fail_instance {
            return Err(vk::Result::ERROR_INCOMPATIBLE_DRIVER);
        }
        state.calls.push(Call::CreateInstance);
        state.instance_request = Some(request.clone());
        Ok(vk::Instance::from_raw(INSTANCE))
    }

    unsafe fn destroy_instance(&self, _instance: vk::Instance) {
        self.log_call(Call::DestroyInstance);
    }

    unsafe fn create_debug_messenger(
        &self,
        _instance: vk::Instance,
        request: &MessengerRequest,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let mut state = self.state.lock();
        if state.fail_messenger {
            return Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT);
        }
        state.calls.push(Call::CreateDebugMessenger);
        state.messenger = Some(request.clone());
        Ok(vk::DebugUtilsMessengerEXT::from_raw(MESSENGER))
    }

    unsafe fn destroy_debug_messenger(
        &self,
        _instance: vk::Instance,
        _messenger: vk::DebugUtilsMessengerEXT,
    ) {
        let mut state = self.state.lock();
        state.calls.push(Call::DestroyDebugMessenger);
        state.messenger = None;
    }

    unsafe fn create_surface(
        &self,
        _instance: vk::Instance,
        _display: RawDisplayHandle,
        _window: RawWindowHandle,
    ) -> VkResult<vk::SurfaceKHR> {
        self.log_call(Call::CreateSurface);
        Ok(vk::SurfaceKHR::from_raw(SURFACE))
    }

    unsafe fn destroy_surface(&self, _instance: vk::Instance, _surface: vk::SurfaceKHR) {
        self.log_call(Call::DestroySurface);
    }

    unsafe fn enumerate_physical_devices(
        &self,
        _instance: vk::Instance,
    ) -> VkResult<Vec<vk::PhysicalDevice>> {
        Ok((0..self.gpus.len() as u64)
            .map(|index| vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE_BASE + index))
            .collect())
    }

    unsafe fn device_info(&self, physical_device: vk::PhysicalDevice) -> VkResult<DeviceInfo> {
        if self.state.lock().fail_device_query {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        let gpu = self.gpu(physical_device);
        Ok(DeviceInfo {
            name: gpu.name.clone(),
            vendor: GpuVendor::Other(0),
            device_type: gpu.device_type,
            api_version: gpu.api_version,
            driver_version: 1,
        })
    }

    unsafe fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        if self.state.lock().fail_device_query {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        Ok(self.gpu(physical_device).families.clone())
    }

    unsafe fn device_extension_names(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<Vec<CString>> {
        Ok(self.gpu(physical_device).extensions.clone())
    }

    unsafe fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        Ok(self.gpu(physical_device).present_families.contains(&family))
    }

    unsafe fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        Ok(self.gpu(physical_device).capabilities)
    }

    unsafe fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.gpu(physical_device).formats.clone())
    }

    unsafe fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(self.gpu(physical_device).present_modes.clone())
    }

    unsafe fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        request: &DeviceRequest,
    ) -> VkResult<vk::Device> {
        let mut state = self.state.lock();
        if state.fail_device {
            return Err(vk::Result::ERROR_FEATURE_NOT_PRESENT);
        }
        state.calls.push(Call::CreateDevice);
        state.device_gpu = Some((physical_device.as_raw() - PHYSICAL_DEVICE_BASE) as usize);
        state.device_request = Some(request.clone());
        Ok(vk::Device::from_raw(DEVICE))
    }

    unsafe fn device_queue(&self, _device: vk::Device, family: u32, _index: u32) -> vk::Queue {
        if self.state.lock().dropped_queues.contains(&family) {
            vk::Queue::null()
        } else {
            vk::Queue::from_raw(QUEUE_BASE + u64::from(family))
        }
    }

    unsafe fn device_wait_idle(&self, _device: vk::Device) -> VkResult<()> {
        self.log_call(Call::DeviceWaitIdle);
        Ok(())
    }

    unsafe fn destroy_device(&self, _device: vk::Device) {
        self.log_call(Call::DestroyDevice);
    }

    unsafe fn create_swapchain(
        &self,
        _device: vk::Device,
        request: &SwapchainRequest,
    ) -> VkResult<vk::SwapchainKHR> {
        let mut state = self.state.lock();
        if state.fail_swapchain {
            return Err(vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR);
        }
        state.calls.push(Call::CreateSwapchain);
        state.swapchain_request = Some(*request);
        Ok(vk::SwapchainKHR::from_raw(SWAPCHAIN))
    }

    unsafe fn swapchain_images(
        &self,
        _device: vk::Device,
        _swapchain: vk::SwapchainKHR,
    ) -> VkResult<Vec<vk::Image>> {
        let requested = {
            let state = self.state.lock();
            if state.fail_swapchain_images {
                return Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
            }
            state
                .swapchain_request
                .map_or(0, |request| request.min_image_count)
        };
        let count = self.device_gpu().image_count.unwrap_or(requested);
        Ok((0..u64::from(count))
            .map(|index| vk::Image::from_raw(IMAGE_BASE + index))
            .collect())
    }

    unsafe fn destroy_swapchain(&self, _device: vk::Device, _swapchain: vk::SwapchainKHR) {
        self.log_call(Call::DestroySwapchain);
    }

    unsafe fn create_image_view(
        &self,
        _device: vk::Device,
        _request: &ImageViewRequest,
    ) -> VkResult<vk::ImageView> {
        let mut state = self.state.lock();
        let index = state.views_created;
        state.views_created += 1;
        state.calls.push(Call::CreateImageView(index));
        if state.fail_image_view == Some(index) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        Ok(vk::ImageView::from_raw(VIEW_BASE + index as u64))
    }

    unsafe fn destroy_image_view(&self, _device: vk::Device, view: vk::ImageView) {
        self.log_call(Call::DestroyImageView(
            (view.as_raw() - VIEW_BASE) as usize,
        ));
    }
}
