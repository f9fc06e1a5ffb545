//! 基于 truvis-gfx 的 FrameBackend 实现

use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;

use truvis_gfx::commands::command_buffer::GfxCommandBuffer;
use truvis_gfx::commands::command_pool::GfxCommandPool;
use truvis_gfx::commands::fence::GfxFence;
use truvis_gfx::commands::semaphore::GfxSemaphore;
use truvis_gfx::commands::submit_info::GfxSubmitInfo;
use truvis_gfx::foundation::device::GfxDevice;
use truvis_gfx::gfx_core::GfxCore;
use truvis_gfx::resources::image_view::{GfxImageView, GfxImageViewDesc};
use truvis_gfx::swapchain::render_swapchain::{GfxSwapchain, GfxSwapchainDesc};

use crate::backend::{ChainConfig, FrameBackend, SurfaceSupport};
use crate::error::{FrameError, FrameResult};

/// 持有 GfxCore 以及每帧 command buffer 所在的 pool
pub struct VulkanFrameBackend {
    core: GfxCore,
    /// 每个 command buffer 在 begin 时单独 reset
    command_pool: GfxCommandPool,
}

// new & init
impl VulkanFrameBackend {
    pub fn new(core: GfxCore) -> FrameResult<Self> {
        let command_pool = GfxCommandPool::new(
            core.gfx_device().clone(),
            core.gfx_queue().queue_family(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            "frame",
        )
        .map_err(|result| FrameError::creation("frame command pool", result))?;

        Ok(Self { core, command_pool })
    }
}

// getters
impl VulkanFrameBackend {
    #[inline]
    pub fn core(&self) -> &GfxCore {
        &self.core
    }

    #[inline]
    pub fn device(&self) -> &Rc<GfxDevice> {
        self.core.gfx_device()
    }
}

// destroy
impl VulkanFrameBackend {
    /// 需要在 FrameScheduler::destroy 之后调用
    pub fn destroy(self) {
        self.command_pool.destroy();
        self.core.destroy();
    }
}

impl FrameBackend for VulkanFrameBackend {
    type Fence = GfxFence;
    type Semaphore = GfxSemaphore;
    type CommandBuffer = GfxCommandBuffer;
    type Swapchain = GfxSwapchain;
    type ImageView = GfxImageView;

    fn create_fence(&mut self, signaled: bool, debug_name: &str) -> VkResult<Self::Fence> {
        GfxFence::new(self.device().clone(), signaled, debug_name)
    }

    fn create_semaphore(&mut self, debug_name: &str) -> VkResult<Self::Semaphore> {
        GfxSemaphore::new(self.device().clone(), debug_name)
    }

    fn allocate_command_buffer(&mut self, debug_name: &str) -> VkResult<Self::CommandBuffer> {
        GfxCommandBuffer::new(self.device().clone(), &self.command_pool, debug_name)
    }

    fn destroy_fence(&mut self, fence: Self::Fence) {
        fence.destroy();
    }

    fn destroy_semaphore(&mut self, semaphore: Self::Semaphore) {
        semaphore.destroy();
    }

    fn free_command_buffer(&mut self, command_buffer: Self::CommandBuffer) {
        command_buffer.free();
    }

    fn wait_fence(&mut self, fence: &Self::Fence, timeout_ns: u64) -> VkResult<()> {
        fence.wait(timeout_ns)
    }

    fn reset_fence(&mut self, fence: &Self::Fence) -> VkResult<()> {
        fence.reset()
    }

    fn begin_command_buffer(&mut self, command_buffer: &Self::CommandBuffer, label: &str) -> VkResult<()> {
        command_buffer.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, label)
    }

    fn end_command_buffer(&mut self, command_buffer: &Self::CommandBuffer) -> VkResult<()> {
        command_buffer.end()
    }

    fn submit(
        &mut self,
        command_buffer: &Self::CommandBuffer,
        wait_on: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> VkResult<()> {
        // image 在 acquire 之后才可以写入，写入之前的阶段不需要等待
        let submit_info = GfxSubmitInfo::new(&[command_buffer])
            .wait(wait_on, vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, None)
            .signal(signal, vk::PipelineStageFlags2::ALL_COMMANDS, None);
        self.core.gfx_queue().submit(std::slice::from_ref(&submit_info), Some(fence))
    }

    fn wait_idle(&mut self) -> VkResult<()> {
        self.device().wait_idle()
    }

    fn surface_support(&self) -> VkResult<SurfaceSupport> {
        let pdevice = self.core.physical_device().vk_handle();
        let surface = self.core.surface();
        Ok(SurfaceSupport {
            capabilities: surface.capabilities(pdevice)?,
            formats: surface.formats(pdevice)?,
            present_modes: surface.present_modes(pdevice)?,
        })
    }

    fn create_swapchain(&mut self, config: &ChainConfig, old: Option<&Self::Swapchain>) -> VkResult<Self::Swapchain> {
        let desc = GfxSwapchainDesc {
            extent: config.extent,
            surface_format: config.surface_format,
            present_mode: config.present_mode,
            image_count: config.image_count,
            pre_transform: config.pre_transform,
            composite_alpha: config.composite_alpha,
        };
        GfxSwapchain::new(
            self.device().clone(),
            self.core.surface(),
            &desc,
            old,
            &self.core.queue_family_indices(),
            "main",
        )
    }

    fn swapchain_images(&self, swapchain: &Self::Swapchain) -> VkResult<Vec<vk::Image>> {
        Ok(swapchain.images().to_vec())
    }

    fn destroy_swapchain(&mut self, swapchain: Self::Swapchain) {
        swapchain.destroy();
    }

    fn create_image_view(&mut self, image: vk::Image, format: vk::Format, debug_name: &str) -> VkResult<Self::ImageView> {
        GfxImageView::new(
            self.device().clone(),
            image,
            GfxImageViewDesc::new_2d(format, vk::ImageAspectFlags::COLOR),
            debug_name,
        )
    }

    fn destroy_image_view(&mut self, view: Self::ImageView) {
        view.destroy();
    }

    fn acquire_next_image(
        &mut self,
        swapchain: &Self::Swapchain,
        timeout_ns: u64,
        signal: &Self::Semaphore,
    ) -> VkResult<(u32, bool)> {
        swapchain.acquire_next_image(timeout_ns, signal)
    }

    fn present(&mut self, swapchain: &Self::Swapchain, image_index: u32, wait_on: &Self::Semaphore) -> VkResult<bool> {
        swapchain.present(self.core.present_queue(), image_index, wait_on)
    }
}
