use std::ffi::CString;
use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;
use itertools::Itertools;

use crate::basic::color::LabelColor;
use crate::commands::barrier::GfxImageBarrier;
use crate::commands::command_pool::GfxCommandPool;
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;

/// 命令缓冲封装
///
/// ```ignore
/// let cmd = GfxCommandBuffer::new(device, &pool, "my-pass")?;
/// cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, "my-pass")?;
/// cmd.cmd_clear_color_image(image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &color);
/// cmd.end()?;
/// ```
pub struct GfxCommandBuffer {
    vk_handle: vk::CommandBuffer,
    command_pool_handle: vk::CommandPool,

    device: Rc<GfxDevice>,
}
// new & init
impl GfxCommandBuffer {
    pub fn new(device: Rc<GfxDevice>, command_pool: &GfxCommandPool, debug_name: &str) -> VkResult<Self> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool.handle())
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffers = unsafe { device.allocate_command_buffers(&info)? };
        let Some(&command_buffer) = command_buffers.first() else {
            return Err(vk::Result::ERROR_UNKNOWN);
        };
        let cmd_buffer = GfxCommandBuffer {
            vk_handle: command_buffer,
            command_pool_handle: command_pool.handle(),
            device,
        };
        cmd_buffer.device.set_debug_name(&cmd_buffer, debug_name);
        Ok(cmd_buffer)
    }

    /// 将 command buffer 还给 pool
    pub fn free(self) {
        unsafe {
            self.device.free_command_buffers(self.command_pool_handle, std::slice::from_ref(&self.vk_handle));
        }
    }
}
// Basic 命令
impl GfxCommandBuffer {
    /// 开始录制 command，会隐式地 reset command buffer
    ///
    /// 自动设置 debug label
    #[inline]
    pub fn begin(&self, usage_flag: vk::CommandBufferUsageFlags, debug_label_name: &str) -> VkResult<()> {
        unsafe {
            self.device
                .begin_command_buffer(self.vk_handle, &vk::CommandBufferBeginInfo::default().flags(usage_flag))?;
        }
        self.begin_label(debug_label_name, LabelColor::COLOR_CMD);
        Ok(())
    }

    /// 结束录制 command
    ///
    /// 结束 debug label
    #[inline]
    pub fn end(&self) -> VkResult<()> {
        self.end_label();
        unsafe { self.device.end_command_buffer(self.vk_handle) }
    }
}
// getters
impl GfxCommandBuffer {
    #[inline]
    pub fn vk_handle(&self) -> vk::CommandBuffer {
        self.vk_handle
    }
}
// 数据传输类型
impl GfxCommandBuffer {
    /// - command type: action
    /// - 支持的 queue：graphics，compute
    #[inline]
    pub fn cmd_clear_color_image(&self, image: vk::Image, layout: vk::ImageLayout, color: &vk::ClearColorValue) {
        let range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };
        unsafe {
            self.device.cmd_clear_color_image(self.vk_handle, image, layout, color, std::slice::from_ref(&range));
        }
    }
}
// 同步命令
impl GfxCommandBuffer {
    /// - command type: synchronize
    /// - supported queue types: graphics, compute, transfer
    #[inline]
    pub fn image_memory_barrier(&self, dependency_flags: vk::DependencyFlags, barriers: &[GfxImageBarrier]) {
        let barriers = barriers.iter().map(|b| *b.inner()).collect_vec();
        let dependency_info =
            vk::DependencyInfo::default().image_memory_barriers(&barriers).dependency_flags(dependency_flags);
        unsafe {
            self.device.cmd_pipeline_barrier2(self.vk_handle, &dependency_info);
        }
    }
}
// debug 相关命令
impl GfxCommandBuffer {
    /// - command type: state, action
    /// - supported queue type: graphics, compute
    #[inline]
    pub fn begin_label(&self, label_name: &str, label_color: glam::Vec4) {
        let name = CString::new(label_name).unwrap_or_default();
        unsafe {
            self.device.debug_utils.cmd_begin_debug_utils_label(
                self.vk_handle,
                &vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(label_color.into()),
            );
        }
    }

    /// - command type: state, action
    /// - supported queue type: graphics, compute
    #[inline]
    pub fn end_label(&self) {
        unsafe {
            self.device.debug_utils.cmd_end_debug_utils_label(self.vk_handle);
        }
    }
}
impl DebugType for GfxCommandBuffer {
    fn debug_type_name() -> &'static str {
        "GfxCommandBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.vk_handle
    }
}
