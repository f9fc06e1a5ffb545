use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;

use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;

/// # Destroy
/// 不实现 Drop，需要手动 destroy
pub struct GfxFence {
    fence: vk::Fence,
    device: Rc<GfxDevice>,
}

impl DebugType for GfxFence {
    fn debug_type_name() -> &'static str {
        "GfxFence"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.fence
    }
}

// 创建与销毁
impl GfxFence {
    /// # param
    /// * signaled - 是否创建时就 signaled
    pub fn new(device: Rc<GfxDevice>, signaled: bool, debug_name: &str) -> VkResult<Self> {
        let fence_flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let fence = unsafe { device.create_fence(&vk::FenceCreateInfo::default().flags(fence_flags), None)? };

        let fence = Self { fence, device };
        fence.device.set_debug_name(&fence, debug_name);
        Ok(fence)
    }
    #[inline]
    pub fn destroy(self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

// getters
impl GfxFence {
    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

// tools
impl GfxFence {
    /// 阻塞等待 fence，超时返回 `Err(vk::Result::TIMEOUT)`
    #[inline]
    pub fn wait(&self, timeout_ns: u64) -> VkResult<()> {
        unsafe { self.device.wait_for_fences(std::slice::from_ref(&self.fence), true, timeout_ns) }
    }

    #[inline]
    pub fn reset(&self) -> VkResult<()> {
        unsafe { self.device.reset_fences(std::slice::from_ref(&self.fence)) }
    }
}
