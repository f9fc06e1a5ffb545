use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;
use itertools::Itertools;

use crate::commands::fence::GfxFence;
use crate::commands::submit_info::GfxSubmitInfo;
use crate::foundation::device::GfxDevice;

#[derive(Debug, Clone)]
pub struct GfxQueueFamily {
    pub name: String,
    pub queue_family_index: u32,
    pub queue_flags: vk::QueueFlags,
    pub queue_count: u32,
}

pub struct GfxCommandQueue {
    pub(crate) vk_queue: vk::Queue,
    pub(crate) queue_family: GfxQueueFamily,
    pub(crate) device: Rc<GfxDevice>,
}

// getters
impl GfxCommandQueue {
    #[inline]
    pub fn handle(&self) -> vk::Queue {
        self.vk_queue
    }

    #[inline]
    pub fn queue_family(&self) -> &GfxQueueFamily {
        &self.queue_family
    }
}

// tools
impl GfxCommandQueue {
    /// 使用 QueueSubmit2 提交，`fence` 会在所有提交完成后被 signal
    pub fn submit(&self, batches: &[GfxSubmitInfo], fence: Option<&GfxFence>) -> VkResult<()> {
        let submit_infos = batches.iter().map(|b| b.submit_info()).collect_vec();
        unsafe {
            self.device.queue_submit2(self.vk_queue, &submit_infos, fence.map_or(vk::Fence::null(), |f| f.handle()))
        }
    }
}
