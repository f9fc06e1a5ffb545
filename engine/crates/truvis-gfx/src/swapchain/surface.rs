use ash::prelude::VkResult;
use ash::vk;

use crate::error::{GfxError, GfxResult};
use crate::foundation::debug_messenger::DebugType;

/// window surface 以及 surface extension 的函数指针
///
/// 所有的 query 都是实时的，窗口变化之后需要重新查询
pub struct GfxSurface {
    pub(crate) handle: vk::SurfaceKHR,
    pub(crate) pf: ash::khr::surface::Instance,
}

// new & init
impl GfxSurface {
    pub fn new(
        vk_entry: &ash::Entry,
        instance: &ash::Instance,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> GfxResult<Self> {
        let surface_pf = ash::khr::surface::Instance::new(vk_entry, instance);

        let surface = unsafe {
            ash_window::create_surface(vk_entry, instance, raw_display_handle, raw_window_handle, None)
                .map_err(GfxError::vk("create surface"))?
        };

        Ok(GfxSurface {
            handle: surface,
            pf: surface_pf,
        })
    }
}

// getters
impl GfxSurface {
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    pub fn capabilities(&self, pdevice: vk::PhysicalDevice) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        unsafe { self.pf.get_physical_device_surface_capabilities(pdevice, self.handle) }
    }

    pub fn formats(&self, pdevice: vk::PhysicalDevice) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe { self.pf.get_physical_device_surface_formats(pdevice, self.handle) }
    }

    pub fn present_modes(&self, pdevice: vk::PhysicalDevice) -> VkResult<Vec<vk::PresentModeKHR>> {
        unsafe { self.pf.get_physical_device_surface_present_modes(pdevice, self.handle) }
    }

    /// queue family 是否可以向这个 surface present
    pub fn supports_present(&self, pdevice: vk::PhysicalDevice, queue_family_index: u32) -> VkResult<bool> {
        unsafe { self.pf.get_physical_device_surface_support(pdevice, queue_family_index, self.handle) }
    }
}

// destroy
impl GfxSurface {
    /// 需要在 swapchain 销毁之后调用
    pub fn destroy(self) {
        log::info!("destroying GfxSurface");
        unsafe { self.pf.destroy_surface(self.handle, None) }
    }
}

impl DebugType for GfxSurface {
    fn debug_type_name() -> &'static str {
        "GfxSurface"
    }
    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
