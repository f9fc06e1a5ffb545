use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;

use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;

pub struct GfxImageView {
    handle: vk::ImageView,

    device: Rc<GfxDevice>,
}
impl DebugType for GfxImageView {
    fn debug_type_name() -> &'static str {
        "GfxImageView"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
// new & init
impl GfxImageView {
    pub fn new(device: Rc<GfxDevice>, image: vk::Image, view_desc: GfxImageViewDesc, name: &str) -> VkResult<Self> {
        let info = vk::ImageViewCreateInfo {
            image,
            view_type: view_desc.view_type,
            format: view_desc.format,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: view_desc.aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            },
            ..Default::default()
        };

        let handle = unsafe { device.create_image_view(&info, None)? };
        let image_view = Self { handle, device };
        image_view.device.set_debug_name(&image_view, name);
        Ok(image_view)
    }
}
// destroy
impl GfxImageView {
    pub fn destroy(self) {
        unsafe {
            self.device.destroy_image_view(self.handle, None);
        }
    }
}
// getters
impl GfxImageView {
    #[inline]
    pub fn handle(&self) -> vk::ImageView {
        self.handle
    }}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxImageViewDesc {
    /// format 可以基于 vk::Image 重解释
    pub(crate) format: vk::Format,
    pub(crate) view_type: vk::ImageViewType,
    pub(crate) aspect_mask: vk::ImageAspectFlags,
}
impl GfxImageViewDesc {
    pub fn new_2d(format: vk::Format, aspect: vk::ImageAspectFlags) -> Self {
        Self {
            format,
            view_type: vk::ImageViewType::TYPE_2D,
            aspect_mask: aspect,
        }
    }
}
