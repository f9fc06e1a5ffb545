//! frame pipeline 所依赖的 GPU 能力
//!
//! 只有一个后端会被编译进来（Vulkan），因此这里是编译期的 trait + 关联类型，而不是 dyn 派发。
//! 词汇类型直接使用 ash 的 vk 类型。

use ash::prelude::VkResult;
use ash::vk;

/// surface 当前支持的配置
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// 一次 chain 构建最终确定下来的逻辑配置
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub extent: vk::Extent2D,
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    /// 请求的 image 数量，平台实际创建的数量可能更多
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
}

/// FrameScheduler 需要的全部 GPU 操作
///
/// 所有的 wait 操作在超时时返回 `Err(vk::Result::TIMEOUT)`
pub trait FrameBackend {
    type Fence;
    type Semaphore;
    type CommandBuffer;
    type Swapchain;
    type ImageView;

    // 同步对象与命令缓冲 ======================================
    fn create_fence(&mut self, signaled: bool, debug_name: &str) -> VkResult<Self::Fence>;
    fn create_semaphore(&mut self, debug_name: &str) -> VkResult<Self::Semaphore>;
    fn allocate_command_buffer(&mut self, debug_name: &str) -> VkResult<Self::CommandBuffer>;

    fn destroy_fence(&mut self, fence: Self::Fence);
    fn destroy_semaphore(&mut self, semaphore: Self::Semaphore);
    fn free_command_buffer(&mut self, command_buffer: Self::CommandBuffer);

    /// CPU 阻塞等待 fence，timeout 单位为纳秒
    fn wait_fence(&mut self, fence: &Self::Fence, timeout_ns: u64) -> VkResult<()>;
    fn reset_fence(&mut self, fence: &Self::Fence) -> VkResult<()>;

    // 录制与提交 ==============================================
    fn begin_command_buffer(&mut self, command_buffer: &Self::CommandBuffer, label: &str) -> VkResult<()>;
    fn end_command_buffer(&mut self, command_buffer: &Self::CommandBuffer) -> VkResult<()>;

    /// 提交到 graphics queue：执行前等待 `wait_on`，完成后 signal `signal` 以及 `fence`
    fn submit(
        &mut self,
        command_buffer: &Self::CommandBuffer,
        wait_on: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> VkResult<()>;

    /// 等待 device 上所有的 queue 空闲
    fn wait_idle(&mut self) -> VkResult<()>;

    // surface 与 swapchain =====================================
    fn surface_support(&self) -> VkResult<SurfaceSupport>;

    /// `old` 不为空时，作为 old_swapchain 传给平台；old 仍然需要调用者销毁
    fn create_swapchain(&mut self, config: &ChainConfig, old: Option<&Self::Swapchain>) -> VkResult<Self::Swapchain>;
    fn swapchain_images(&self, swapchain: &Self::Swapchain) -> VkResult<Vec<vk::Image>>;
    fn destroy_swapchain(&mut self, swapchain: Self::Swapchain);

    fn create_image_view(
        &mut self,
        image: vk::Image,
        format: vk::Format,
        debug_name: &str,
    ) -> VkResult<Self::ImageView>;
    fn destroy_image_view(&mut self, view: Self::ImageView);

    /// 成功时返回 (image index, is_suboptimal)，并且在 GPU 侧 signal `signal`
    fn acquire_next_image(
        &mut self,
        swapchain: &Self::Swapchain,
        timeout_ns: u64,
        signal: &Self::Semaphore,
    ) -> VkResult<(u32, bool)>;

    /// 成功时返回 is_suboptimal
    fn present(&mut self, swapchain: &Self::Swapchain, image_index: u32, wait_on: &Self::Semaphore) -> VkResult<bool>;
}
