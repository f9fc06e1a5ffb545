use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::commands::command_queue::GfxCommandQueue;
use crate::error::{GfxError, GfxResult};
use crate::foundation::{
    debug_messenger::GfxDebugMsger, device::GfxDevice, instance::GfxInstance, physical_device::GfxPhysicalDevice,
};
use crate::swapchain::surface::GfxSurface;

pub struct GfxCoreDesc {
    pub app_name: String,
    pub enable_validation: bool,
}

/// 呈现一个窗口所需的全部 Vulkan 基础对象
pub struct GfxCore {
    /// vk 基础函数的接口
    ///
    /// 在 drop 之后，会卸载 dll，因此需要确保该字段最后 drop
    pub(crate) vk_entry: ash::Entry,

    pub(crate) instance: GfxInstance,
    pub(crate) debug_msger: GfxDebugMsger,
    pub(crate) surface: GfxSurface,
    pub(crate) physical_device: GfxPhysicalDevice,

    /// 使用 Rc<> 的时机：由 GfxCore 创建的对象，可以通过 Rc 去访问 device 的函数指针
    pub(crate) gfx_device: Rc<GfxDevice>,

    pub(crate) gfx_queue: GfxCommandQueue,
    /// 可能与 gfx_queue 是同一个 queue
    pub(crate) present_queue: GfxCommandQueue,
}

// 创建与销毁
impl GfxCore {
    pub fn new(
        desc: &GfxCoreDesc,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> GfxResult<Self> {
        let vk_entry = unsafe { ash::Entry::load()? };

        let surface_exts = ash_window::enumerate_required_extensions(raw_display_handle)
            .map_err(GfxError::vk("enumerate surface extensions"))?;
        let instance = GfxInstance::new(&vk_entry, &desc.app_name, surface_exts, desc.enable_validation)?;
        let debug_msger = GfxDebugMsger::new(&vk_entry, &instance.ash_instance)?;
        let surface = GfxSurface::new(&vk_entry, &instance.ash_instance, raw_display_handle, raw_window_handle)?;
        let physical_device = GfxPhysicalDevice::new_descrete_physical_device(&instance.ash_instance, &surface)?;
        log::info!("use gpu: {:?}", physical_device.name());

        let queue_family_indices = Self::unique_queue_families(&physical_device);
        let queue_create_infos = queue_family_indices
            .iter()
            .map(|idx| vk::DeviceQueueCreateInfo::default().queue_family_index(*idx).queue_priorities(&[1.0]))
            .collect_vec();

        let gfx_device = Rc::new(GfxDevice::new(&instance.ash_instance, physical_device.vk_handle, &queue_create_infos)?);
        let make_queue = |family: &crate::commands::command_queue::GfxQueueFamily| GfxCommandQueue {
            vk_queue: unsafe { gfx_device.get_device_queue(family.queue_family_index, 0) },
            queue_family: family.clone(),
            device: gfx_device.clone(),
        };
        let gfx_queue = make_queue(&physical_device.gfx_queue_family);
        let present_queue = make_queue(&physical_device.present_queue_family);

        log::info!("gfx queue's queue family:\n{:#?}", gfx_queue.queue_family);
        log::info!("present queue's queue family:\n{:#?}", present_queue.queue_family);

        // 在 device 以及 debug_utils 之前创建的 vk::Handle
        {
            gfx_device.set_object_debug_name(instance.vk_instance(), "GfxInstance");
            gfx_device.set_object_debug_name(physical_device.vk_handle, "GfxPhysicalDevice");
            gfx_device.set_debug_name(gfx_device.as_ref(), "main");
            gfx_device.set_debug_name(&surface, "main");
            gfx_device.set_object_debug_name(gfx_queue.vk_queue, "GfxCommandQueue-gfx");
            gfx_device.set_object_debug_name(present_queue.vk_queue, "GfxCommandQueue-present");
        }

        Ok(Self {
            vk_entry,
            instance,
            debug_msger,
            surface,
            physical_device,
            gfx_device,
            gfx_queue,
            present_queue,
        })
    }

    /// 所有 GfxCore 之外的对象都需要在此之前销毁
    pub fn destroy(self) {
        self.gfx_device.destroy();
        self.surface.destroy();
        self.debug_msger.destroy();
        self.instance.destroy();
    }

    fn unique_queue_families(physical_device: &GfxPhysicalDevice) -> Vec<u32> {
        [
            physical_device.gfx_queue_family.queue_family_index,
            physical_device.present_queue_family.queue_family_index,
        ]
        .into_iter()
        .unique()
        .collect_vec()
    }
}

// getters
impl GfxCore {
    #[inline]
    pub fn gfx_device(&self) -> &Rc<GfxDevice> {
        &self.gfx_device
    }

    #[inline]
    pub fn physical_device(&self) -> &GfxPhysicalDevice {
        &self.physical_device
    }

    #[inline]
    pub fn surface(&self) -> &GfxSurface {
        &self.surface
    }

    #[inline]
    pub fn gfx_queue(&self) -> &GfxCommandQueue {
        &self.gfx_queue
    }

    #[inline]
    pub fn present_queue(&self) -> &GfxCommandQueue {
        &self.present_queue
    }

    /// swapchain image 需要在这些 queue family 之间共享
    #[inline]
    pub fn queue_family_indices(&self) -> Vec<u32> {
        Self::unique_queue_families(&self.physical_device)
    }
}
