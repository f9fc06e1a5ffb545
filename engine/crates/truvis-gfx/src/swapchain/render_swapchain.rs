use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;

use crate::commands::command_queue::GfxCommandQueue;
use crate::commands::semaphore::GfxSemaphore;
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;
use crate::swapchain::surface::GfxSurface;

/// 创建 swapchain 所需的全部参数，由上层根据 surface 的能力决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfxSwapchainDesc {
    pub extent: vk::Extent2D,
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
}

/// 只负责 swapchain 对象本身，image view 以及重建的时机由上层管理
pub struct GfxSwapchain {
    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,

    device: Rc<GfxDevice>,
}

// new & init
impl GfxSwapchain {
    /// `old_swapchain` 会被标记为 retired，但是仍然需要调用者销毁
    ///
    /// `queue_family_indices` 中有多个 family 时，image 使用 CONCURRENT 模式共享
    pub fn new(
        device: Rc<GfxDevice>,
        surface: &GfxSurface,
        desc: &GfxSwapchainDesc,
        old_swapchain: Option<&GfxSwapchain>,
        queue_family_indices: &[u32],
        debug_name: &str,
    ) -> VkResult<Self> {
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle())
            .min_image_count(desc.image_count)
            .image_format(desc.surface_format.format)
            .image_color_space(desc.surface_format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(1)
            // TRANSFER_DST 用于 clear 以及 Nsight 分析
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .pre_transform(desc.pre_transform)
            .composite_alpha(desc.composite_alpha)
            .present_mode(desc.present_mode)
            .old_swapchain(old_swapchain.map_or(vk::SwapchainKHR::null(), |sc| sc.handle))
            .clipped(true);
        create_info = if queue_family_indices.len() > 1 {
            create_info.image_sharing_mode(vk::SharingMode::CONCURRENT).queue_family_indices(queue_family_indices)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let handle = unsafe { device.swapchain.create_swapchain(&create_info, None)? };
        let images = match unsafe { device.swapchain.get_swapchain_images(handle) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { device.swapchain.destroy_swapchain(handle, None) };
                return Err(e);
            }
        };

        let swapchain = Self {
            handle,
            images,
            device,
        };
        swapchain.device.set_debug_name(&swapchain, debug_name);
        for (idx, image) in swapchain.images.iter().enumerate() {
            swapchain.device.set_object_debug_name(*image, format!("{}-image-{}", debug_name, idx));
        }

        Ok(swapchain)
    }
}

// getters
impl GfxSwapchain {
    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    #[inline]
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }
}

// update
impl GfxSwapchain {
    /// timeout: nano seconds
    ///
    /// 返回 (image index, is suboptimal)，OUT_OF_DATE 等情况以 Err 返回，由调用者决定如何处理
    #[inline]
    pub fn acquire_next_image(&self, timeout: u64, signal_semaphore: &GfxSemaphore) -> VkResult<(u32, bool)> {
        let result = unsafe {
            self.device.swapchain.acquire_next_image(self.handle, timeout, signal_semaphore.handle(), vk::Fence::null())
        };
        match &result {
            Ok((image_index, true)) => log::warn!("swapchain acquire image index {} is not optimal", image_index),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => log::warn!("swapchain is out of date when acquire next image"),
            _ => (),
        }
        result
    }

    /// 返回 is suboptimal
    #[inline]
    pub fn present(&self, queue: &GfxCommandQueue, image_index: u32, wait_semaphore: &GfxSemaphore) -> VkResult<bool> {
        let wait_semaphores = [wait_semaphore.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .image_indices(&image_indices)
            .swapchains(std::slice::from_ref(&self.handle));

        let result = unsafe { self.device.swapchain.queue_present(queue.handle(), &present_info) };
        match &result {
            Ok(true) => log::warn!("swapchain present image index {} is not optimal", image_index),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => log::warn!("swapchain is out of date when present image"),
            _ => (),
        }
        result
    }
}

// destroy
impl GfxSwapchain {
    /// 调用者需要保证 image 不再被 GPU 使用
    pub fn destroy(self) {
        unsafe {
            self.device.swapchain.destroy_swapchain(self.handle, None);
        }
    }
}

impl DebugType for GfxSwapchain {
    fn debug_type_name() -> &'static str {
        "GfxSwapchain"
    }
    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
