//! 用于测试的无窗口后端
//!
//! 模拟了 GPU 按提交顺序完成工作、fence 与 semaphore 的状态、平台 surface 的尺寸变化，
//! 并在违反同步规则时直接 panic（例如录制一个 GPU 仍在使用的 command buffer）。

use std::collections::{HashMap, VecDeque};

use ash::prelude::VkResult;
use ash::vk;
use ash::vk::Handle;

use crate::backend::{ChainConfig, FrameBackend, SurfaceSupport};

pub struct HeadlessFence(usize);
pub struct HeadlessSemaphore(usize);
pub struct HeadlessCommandBuffer(usize);
pub struct HeadlessSwapchain(usize);
pub struct HeadlessImageView;

impl HeadlessCommandBuffer {
    pub fn id(&self) -> usize {
        self.0
    }
}

/// 后端上发生过的操作，按顺序记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadlessEvent {
    WaitFence { fence: usize, blocked: bool },
    ResetFence { fence: usize },
    BeginRecording { command_buffer: usize },
    Submit { command_buffer: usize, fence: usize },
    Acquire { swapchain: usize, image_index: u32 },
    Present { swapchain: usize, image_index: u32 },
    WaitIdle,
    CreateSwapchain { swapchain: usize },
    DestroySwapchain { swapchain: usize },
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct HeadlessCounters {
    pub submits: usize,
    pub presents: usize,
    pub acquires: usize,
    pub swapchains_created: usize,
    pub wait_idles: usize,
    /// CPU 真正被阻塞的 fence wait 次数
    pub blocking_fence_waits: usize,
}

/// 平台 surface 的状态，测试中可以随时修改
pub struct HeadlessSurface {
    pub current_extent: vk::Extent2D,
    /// 为 true 时 capabilities.current_extent 为 0xFFFFFFFF，由 swapchain 决定尺寸
    pub extent_follows_swapchain: bool,
    pub min_image_count: u32,
    pub max_image_count: u32,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    pub lost: bool,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self {
            current_extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            extent_follows_swapchain: false,
            min_image_count: 2,
            max_image_count: 8,
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::R8G8B8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            lost: false,
        }
    }
}

struct FenceState {
    signaled: bool,
    alive: bool,
}

struct SemaphoreState {
    signaled: bool,
    alive: bool,
}

struct CommandBufferState {
    recording: bool,
    in_flight: bool,
    alive: bool,
}

struct SwapchainState {
    config: ChainConfig,
    images: Vec<vk::Image>,
    next_image: u32,
    alive: bool,
}

struct PendingSubmit {
    command_buffer: usize,
    fence: usize,
}

pub struct HeadlessBackend {
    pub surface: HeadlessSurface,

    /// GPU 在不被等待的情况下最多积压多少个提交；超出的部分会自动完成
    ///
    /// usize::MAX 表示 GPU 非常慢，只有 CPU 等待时才会完成
    pub gpu_backlog: usize,
    /// 为 true 时，等待任何未完成的 fence 都会超时
    pub hang: bool,
    /// 第 n 次 present（从 0 开始）返回指定的结果
    pub present_script: HashMap<usize, vk::Result>,
    /// 第 n 次 acquire（从 0 开始）返回指定的结果
    pub acquire_script: HashMap<usize, vk::Result>,
    /// 创建第 n 个对象（fence/semaphore/command buffer，从 0 开始）时失败
    pub fail_object_creation_at: Option<usize>,

    pub counters: HeadlessCounters,
    pub events: Vec<HeadlessEvent>,

    objects_created: usize,
    fences: Vec<FenceState>,
    semaphores: Vec<SemaphoreState>,
    command_buffers: Vec<CommandBufferState>,
    swapchains: Vec<SwapchainState>,
    live_views: usize,
    pending: VecDeque<PendingSubmit>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self {
            surface: HeadlessSurface::default(),
            gpu_backlog: 0,
            hang: false,
            present_script: HashMap::new(),
            acquire_script: HashMap::new(),
            fail_object_creation_at: None,
            counters: HeadlessCounters::default(),
            events: Vec::new(),
            objects_created: 0,
            fences: Vec::new(),
            semaphores: Vec::new(),
            command_buffers: Vec::new(),
            swapchains: Vec::new(),
            live_views: 0,
            pending: VecDeque::new(),
        }
    }
}

// tools
impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 一个很慢的 GPU：提交的工作只有在 CPU 等待时才会完成
    pub fn slow_gpu() -> Self {
        Self {
            gpu_backlog: usize::MAX,
            ..Default::default()
        }
    }

    pub fn set_surface_extent(&mut self, width: u32, height: u32) {
        self.surface.current_extent = vk::Extent2D { width, height };
    }

    /// 还存活的 GPU 对象数量
    pub fn live_objects(&self) -> usize {
        self.fences.iter().filter(|f| f.alive).count()
            + self.semaphores.iter().filter(|s| s.alive).count()
            + self.command_buffers.iter().filter(|c| c.alive).count()
            + self.swapchains.iter().filter(|s| s.alive).count()
            + self.live_views
    }

    pub fn pending_submits(&self) -> usize {
        self.pending.len()
    }

    pub fn fence_signaled(&self, fence: &HeadlessFence) -> bool {
        self.fences[fence.0].signaled
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn next_object(&mut self) -> VkResult<()> {
        let index = self.objects_created;
        self.objects_created += 1;
        if self.fail_object_creation_at == Some(index) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        Ok(())
    }

    /// GPU 完成最早的一个提交
    fn complete_oldest(&mut self) -> bool {
        let Some(done) = self.pending.pop_front() else {
            return false;
        };
        self.fences[done.fence].signaled = true;
        self.command_buffers[done.command_buffer].in_flight = false;
        true
    }

    fn surface_extent_matches(&self, config: &ChainConfig) -> bool {
        self.surface.extent_follows_swapchain || self.surface.current_extent == config.extent
    }
}

impl FrameBackend for HeadlessBackend {
    type Fence = HeadlessFence;
    type Semaphore = HeadlessSemaphore;
    type CommandBuffer = HeadlessCommandBuffer;
    type Swapchain = HeadlessSwapchain;
    type ImageView = HeadlessImageView;

    fn create_fence(&mut self, signaled: bool, _debug_name: &str) -> VkResult<Self::Fence> {
        self.next_object()?;
        self.fences.push(FenceState { signaled, alive: true });
        Ok(HeadlessFence(self.fences.len() - 1))
    }

    fn create_semaphore(&mut self, _debug_name: &str) -> VkResult<Self::Semaphore> {
        self.next_object()?;
        self.semaphores.push(SemaphoreState {
            signaled: false,
            alive: true,
        });
        Ok(HeadlessSemaphore(self.semaphores.len() - 1))
    }

    fn allocate_command_buffer(&mut self, _debug_name: &str) -> VkResult<Self::CommandBuffer> {
        self.next_object()?;
        self.command_buffers.push(CommandBufferState {
            recording: false,
            in_flight: false,
            alive: true,
        });
        Ok(HeadlessCommandBuffer(self.command_buffers.len() - 1))
    }

    fn destroy_fence(&mut self, fence: Self::Fence) {
        assert!(self.pending.iter().all(|p| p.fence != fence.0), "fence {} destroyed while in flight", fence.0);
        self.fences[fence.0].alive = false;
    }

    fn destroy_semaphore(&mut self, semaphore: Self::Semaphore) {
        assert!(self.pending.is_empty(), "semaphore {} destroyed while work is in flight", semaphore.0);
        self.semaphores[semaphore.0].alive = false;
    }

    fn free_command_buffer(&mut self, command_buffer: Self::CommandBuffer) {
        assert!(
            !self.command_buffers[command_buffer.0].in_flight,
            "command buffer {} freed while in flight",
            command_buffer.0
        );
        self.command_buffers[command_buffer.0].alive = false;
    }

    fn wait_fence(&mut self, fence: &Self::Fence, _timeout_ns: u64) -> VkResult<()> {
        if self.fences[fence.0].signaled {
            self.events.push(HeadlessEvent::WaitFence {
                fence: fence.0,
                blocked: false,
            });
            return Ok(());
        }

        let is_pending = self.pending.iter().any(|p| p.fence == fence.0);
        // 没有任何提交会 signal 这个 fence，真实的驱动会一直等到超时
        if self.hang || !is_pending {
            return Err(vk::Result::TIMEOUT);
        }

        while !self.fences[fence.0].signaled {
            self.complete_oldest();
        }
        self.counters.blocking_fence_waits += 1;
        self.events.push(HeadlessEvent::WaitFence {
            fence: fence.0,
            blocked: true,
        });
        Ok(())
    }

    fn reset_fence(&mut self, fence: &Self::Fence) -> VkResult<()> {
        assert!(self.pending.iter().all(|p| p.fence != fence.0), "fence {} reset while in flight", fence.0);
        self.fences[fence.0].signaled = false;
        self.events.push(HeadlessEvent::ResetFence { fence: fence.0 });
        Ok(())
    }

    fn begin_command_buffer(&mut self, command_buffer: &Self::CommandBuffer, _label: &str) -> VkResult<()> {
        let state = &mut self.command_buffers[command_buffer.0];
        assert!(!state.in_flight, "command buffer {} re-recorded while the GPU still executes it", command_buffer.0);
        assert!(!state.recording, "command buffer {} is already recording", command_buffer.0);
        state.recording = true;
        self.events.push(HeadlessEvent::BeginRecording {
            command_buffer: command_buffer.0,
        });
        Ok(())
    }

    fn end_command_buffer(&mut self, command_buffer: &Self::CommandBuffer) -> VkResult<()> {
        let state = &mut self.command_buffers[command_buffer.0];
        assert!(state.recording, "command buffer {} is not recording", command_buffer.0);
        state.recording = false;
        Ok(())
    }

    fn submit(
        &mut self,
        command_buffer: &Self::CommandBuffer,
        wait_on: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> VkResult<()> {
        assert!(!self.command_buffers[command_buffer.0].recording, "submitting a command buffer still recording");
        assert!(!self.fences[fence.0].signaled, "submit fence {} must be unsignaled", fence.0);
        assert!(self.semaphores[wait_on.0].signaled, "submission waits on a semaphore nobody signals");
        assert!(!self.semaphores[signal.0].signaled, "signal semaphore already has a pending signal");

        self.semaphores[wait_on.0].signaled = false;
        self.semaphores[signal.0].signaled = true;
        self.command_buffers[command_buffer.0].in_flight = true;
        self.pending.push_back(PendingSubmit {
            command_buffer: command_buffer.0,
            fence: fence.0,
        });
        self.counters.submits += 1;
        self.events.push(HeadlessEvent::Submit {
            command_buffer: command_buffer.0,
            fence: fence.0,
        });

        while self.pending.len() > self.gpu_backlog {
            self.complete_oldest();
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> VkResult<()> {
        while self.complete_oldest() {}
        self.counters.wait_idles += 1;
        self.events.push(HeadlessEvent::WaitIdle);
        Ok(())
    }

    fn surface_support(&self) -> VkResult<SurfaceSupport> {
        if self.surface.lost {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        let current_extent = if self.surface.extent_follows_swapchain {
            vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            }
        } else {
            self.surface.current_extent
        };
        Ok(SurfaceSupport {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: self.surface.min_image_count,
                max_image_count: self.surface.max_image_count,
                current_extent,
                min_image_extent: vk::Extent2D { width: 1, height: 1 },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            },
            formats: self.surface.formats.clone(),
            present_modes: self.surface.present_modes.clone(),
        })
    }

    fn create_swapchain(&mut self, config: &ChainConfig, old: Option<&Self::Swapchain>) -> VkResult<Self::Swapchain> {
        if let Some(old) = old {
            assert!(self.swapchains[old.0].alive, "old swapchain {} already destroyed", old.0);
        }
        let id = self.swapchains.len();
        let images = (0..config.image_count).map(|i| vk::Image::from_raw(((id as u64 + 1) << 16) | i as u64)).collect();
        self.swapchains.push(SwapchainState {
            config: *config,
            images,
            next_image: 0,
            alive: true,
        });
        self.counters.swapchains_created += 1;
        self.events.push(HeadlessEvent::CreateSwapchain { swapchain: id });
        Ok(HeadlessSwapchain(id))
    }

    fn swapchain_images(&self, swapchain: &Self::Swapchain) -> VkResult<Vec<vk::Image>> {
        Ok(self.swapchains[swapchain.0].images.clone())
    }

    fn destroy_swapchain(&mut self, swapchain: Self::Swapchain) {
        assert!(self.pending.is_empty(), "swapchain {} destroyed while work is in flight", swapchain.0);
        self.swapchains[swapchain.0].alive = false;
        self.events.push(HeadlessEvent::DestroySwapchain { swapchain: swapchain.0 });
    }

    fn create_image_view(
        &mut self,
        _image: vk::Image,
        _format: vk::Format,
        _debug_name: &str,
    ) -> VkResult<Self::ImageView> {
        self.live_views += 1;
        Ok(HeadlessImageView)
    }

    fn destroy_image_view(&mut self, _view: Self::ImageView) {
        assert!(self.pending.is_empty(), "image view destroyed while work is in flight");
        self.live_views -= 1;
    }

    fn acquire_next_image(
        &mut self,
        swapchain: &Self::Swapchain,
        _timeout_ns: u64,
        signal: &Self::Semaphore,
    ) -> VkResult<(u32, bool)> {
        let call = self.counters.acquires;
        self.counters.acquires += 1;

        if self.surface.lost {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        if let Some(result) = self.acquire_script.get(&call) {
            if *result != vk::Result::SUBOPTIMAL_KHR {
                return Err(*result);
            }
        }
        let state = &self.swapchains[swapchain.0];
        assert!(state.alive, "acquire from destroyed swapchain {}", swapchain.0);
        if !self.surface_extent_matches(&state.config) {
            return Err(vk::Result::ERROR_OUT_OF_DATE_KHR);
        }
        assert!(!self.semaphores[signal.0].signaled, "acquire semaphore already has a pending signal");

        let state = &mut self.swapchains[swapchain.0];
        let image_index = state.next_image;
        state.next_image = (state.next_image + 1) % state.images.len() as u32;
        self.semaphores[signal.0].signaled = true;
        self.events.push(HeadlessEvent::Acquire {
            swapchain: swapchain.0,
            image_index,
        });

        let suboptimal = self.acquire_script.get(&call) == Some(&vk::Result::SUBOPTIMAL_KHR);
        Ok((image_index, suboptimal))
    }

    fn present(&mut self, swapchain: &Self::Swapchain, image_index: u32, wait_on: &Self::Semaphore) -> VkResult<bool> {
        let call = self.counters.presents;
        self.counters.presents += 1;

        assert!(self.swapchains[swapchain.0].alive, "present to destroyed swapchain {}", swapchain.0);
        assert!(self.semaphores[wait_on.0].signaled, "present waits on a semaphore nobody signals");
        self.semaphores[wait_on.0].signaled = false;
        self.events.push(HeadlessEvent::Present {
            swapchain: swapchain.0,
            image_index,
        });

        if self.surface.lost {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        match self.present_script.get(&call) {
            Some(&vk::Result::SUBOPTIMAL_KHR) => Ok(true),
            Some(result) => Err(*result),
            None => Ok(false),
        }
    }
}
