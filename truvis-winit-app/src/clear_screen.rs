use ash::vk;
use truvis_frame::frame_scheduler::FrameTarget;
use truvis_gfx::basic::color::LabelColor;
use truvis_gfx::commands::barrier::GfxImageBarrier;
use truvis_gfx::commands::command_buffer::GfxCommandBuffer;

/// 用随时间变化的颜色清空 presentable image
pub struct ClearScreen;

impl ClearScreen {
    /// 三个通道使用不同相位的正弦，周期约 6 秒
    pub fn clear_color(time_s: f32) -> glam::Vec4 {
        let phase = glam::vec3(0.0, 2.094, 4.189);
        let rgb = (glam::Vec3::splat(time_s) + phase).to_array().map(|x| 0.5 + 0.5 * x.sin());
        glam::vec4(rgb[0], rgb[1], rgb[2], 1.0)
    }

    /// image 之前的内容不需要保留，直接从 UNDEFINED 转换
    pub fn record(cmd: &GfxCommandBuffer, target: &FrameTarget, color: glam::Vec4) {
        cmd.begin_label(&format!("clear-image-{}", target.image_index), LabelColor::COLOR_PASS);

        let to_transfer = GfxImageBarrier::new()
            .image(target.image)
            .image_aspect_flag(vk::ImageAspectFlags::COLOR)
            .layout_transfer(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            // 与 submit 时等待 image_ready 的 stage 对齐
            .src_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, vk::AccessFlags2::NONE)
            .dst_mask(vk::PipelineStageFlags2::CLEAR, vk::AccessFlags2::TRANSFER_WRITE);
        cmd.image_memory_barrier(vk::DependencyFlags::empty(), std::slice::from_ref(&to_transfer));

        cmd.cmd_clear_color_image(
            target.image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &vk::ClearColorValue {
                float32: color.to_array(),
            },
        );

        let to_present = GfxImageBarrier::new()
            .image(target.image)
            .image_aspect_flag(vk::ImageAspectFlags::COLOR)
            .layout_transfer(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR)
            .src_mask(vk::PipelineStageFlags2::CLEAR, vk::AccessFlags2::TRANSFER_WRITE)
            .dst_mask(vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::AccessFlags2::NONE);
        cmd.image_memory_barrier(vk::DependencyFlags::empty(), std::slice::from_ref(&to_present));

        cmd.end_label();
    }
}
