use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;

use crate::commands::command_queue::GfxQueueFamily;
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;

/// command pool 是和 queue family 绑定的，而不是和 queue 绑定的
pub struct GfxCommandPool {
    handle: vk::CommandPool,

    device: Rc<GfxDevice>,
}
impl DebugType for GfxCommandPool {
    fn debug_type_name() -> &'static str {
        "GfxCommandPool"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
// new & init
impl GfxCommandPool {
    pub fn new(
        device: Rc<GfxDevice>,
        queue_family: &GfxQueueFamily,
        flags: vk::CommandPoolCreateFlags,
        debug_name: &str,
    ) -> VkResult<Self> {
        let pool = unsafe {
            device.create_command_pool(
                &vk::CommandPoolCreateInfo::default()
                    .queue_family_index(queue_family.queue_family_index)
                    .flags(flags),
                None,
            )?
        };

        let command_pool = Self { handle: pool, device };
        command_pool.device.set_debug_name(&command_pool, debug_name);
        Ok(command_pool)
    }
}
// getters
impl GfxCommandPool {
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.handle
    }
}
// destroy
impl GfxCommandPool {
    /// pool 中所有的 command buffer 都会被一起释放
    pub fn destroy(self) {
        unsafe {
            self.device.destroy_command_pool(self.handle, None);
        }
    }
}
