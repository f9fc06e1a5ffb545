use std::ffi::CStr;

use ash::vk;
use itertools::Itertools;

use crate::commands::command_queue::GfxQueueFamily;
use crate::error::{GfxError, GfxResult};
use crate::swapchain::surface::GfxSurface;

/// 表示一张物理显卡
pub struct GfxPhysicalDevice {
    pub(crate) vk_handle: vk::PhysicalDevice,

    /// 当前 gpu 的基础属性
    pub(crate) basic_props: vk::PhysicalDeviceProperties,

    pub(crate) gfx_queue_family: GfxQueueFamily,
    /// 可以向 surface present 的 queue family，可能与 gfx_queue_family 相同
    pub(crate) present_queue_family: GfxQueueFamily,
}

impl GfxPhysicalDevice {
    /// 选择一张同时支持 graphics 和向 surface present 的显卡
    ///
    /// 优先选择独立显卡，如果没有则选择第一个可用的显卡
    pub fn new_descrete_physical_device(instance: &ash::Instance, surface: &GfxSurface) -> GfxResult<Self> {
        let pdevices = unsafe { instance.enumerate_physical_devices() }
            .map_err(GfxError::vk("enumerate physical devices"))?;

        pdevices
            .into_iter()
            .filter_map(|pdevice| Self::new(pdevice, instance, surface))
            // 优先使用独立显卡
            .find_or_first(GfxPhysicalDevice::is_descrete_gpu)
            .ok_or(GfxError::NoSuitableDevice)
    }

    /// 不满足条件的显卡返回 None
    fn new(pdevice: vk::PhysicalDevice, instance: &ash::Instance, surface: &GfxSurface) -> Option<Self> {
        let basic_props = unsafe { instance.get_physical_device_properties(pdevice) };
        let physical_device_name = basic_props.device_name_as_c_str().unwrap_or(c"unknown");
        log::info!("found gpu: {:?}", physical_device_name);

        // swapchain 是必须的
        let device_extensions = unsafe { instance.enumerate_device_extension_properties(pdevice) }.ok()?;
        let supports_swapchain = device_extensions
            .iter()
            .any(|ext| ext.extension_name_as_c_str().is_ok_and(|name| name == ash::khr::swapchain::NAME));
        if !supports_swapchain {
            log::warn!("gpu {:?} does not support {:?}, skip", physical_device_name, ash::khr::swapchain::NAME);
            return None;
        }

        let queue_family_props = unsafe { instance.get_physical_device_queue_family_properties(pdevice) };
        log::debug!("physical device: queue family props:\n{:#?}", queue_family_props);

        let make_family = |name: &str, family_idx: usize| GfxQueueFamily {
            name: name.to_string(),
            queue_family_index: family_idx as u32,
            queue_flags: queue_family_props[family_idx].queue_flags,
            queue_count: queue_family_props[family_idx].queue_count,
        };
        let can_present = |family_idx: usize| surface.supports_present(pdevice, family_idx as u32).unwrap_or(false);

        let graphics_families = queue_family_props
            .iter()
            .positions(|props| props.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .collect_vec();
        let Some(&first_graphics) = graphics_families.first() else {
            log::warn!("gpu {:?} has no graphics queue, skip", physical_device_name);
            return None;
        };

        // 尽量让 graphics 和 present 使用同一个 queue family，这样 swapchain image 不需要在 family 之间共享
        let (gfx_idx, present_idx) = match graphics_families.iter().copied().find(|idx| can_present(*idx)) {
            Some(idx) => (idx, idx),
            None => match (0..queue_family_props.len()).find(|idx| can_present(*idx)) {
                Some(present_idx) => (first_graphics, present_idx),
                None => {
                    log::warn!("gpu {:?} can not present to the surface, skip", physical_device_name);
                    return None;
                }
            },
        };

        Some(Self {
            vk_handle: pdevice,
            basic_props,
            gfx_queue_family: make_family("gfx", gfx_idx),
            present_queue_family: make_family("present", present_idx),
        })
    }

    #[inline]
    /// 当前 gpu 是否是独立显卡
    pub fn is_descrete_gpu(&self) -> bool {
        self.basic_props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
    }

    #[inline]
    pub fn vk_handle(&self) -> vk::PhysicalDevice {
        self.vk_handle
    }

    pub fn name(&self) -> &CStr {
        self.basic_props.device_name_as_c_str().unwrap_or(c"unknown")
    }

    #[inline]
    pub fn gfx_queue_family(&self) -> &GfxQueueFamily {
        &self.gfx_queue_family
    }

    #[inline]
    pub fn present_queue_family(&self) -> &GfxQueueFamily {
        &self.present_queue_family
    }
}
