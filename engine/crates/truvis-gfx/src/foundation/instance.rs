use std::ffi::{CStr, CString, c_char};

use ash::vk;
use itertools::Itertools;

use crate::error::{GfxError, GfxResult};
use crate::foundation::debug_messenger::GfxDebugMsger;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

pub struct GfxInstance {
    pub(crate) ash_instance: ash::Instance,
}

impl GfxInstance {
    /// 设置所需的 layers 和 extensions，创建 vk instance
    ///
    /// validation layer 没有安装时只会输出警告
    pub fn new(
        vk_entry: &ash::Entry,
        app_name: &str,
        extra_instance_exts: &[*const c_char],
        enable_validation: bool,
    ) -> GfxResult<Self> {
        let app_name = CString::new(app_name).unwrap_or_default();
        let app_info = vk::ApplicationInfo::default()
            .api_version(vk::API_VERSION_1_3)
            .application_name(app_name.as_ref())
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"Truvis")
            .engine_version(vk::make_api_version(0, 1, 0, 0));

        let enabled_extensions = Self::get_extensions(vk_entry, extra_instance_exts)?;
        let enabled_extensions_str =
            enabled_extensions.iter().map(|ext| format!("\n\t{:?}", unsafe { CStr::from_ptr(*ext) })).join("");
        log::info!("instance extensions: {}", enabled_extensions_str);

        let enabled_layers = Self::get_layers(vk_entry, enable_validation)?;
        log::info!("instance layers: {:?}", enabled_layers);
        let enabled_layer_ptrs = enabled_layers.iter().map(|layer| layer.as_ptr()).collect_vec();

        // 为 instance info 添加 debug messenger，这样 instance 创建过程中的消息也能输出
        let mut debug_utils_messenger_ci = GfxDebugMsger::debug_utils_messenger_ci();
        let instance_ci = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&enabled_extensions)
            .enabled_layer_names(&enabled_layer_ptrs)
            .push_next(&mut debug_utils_messenger_ci);

        let handle =
            unsafe { vk_entry.create_instance(&instance_ci, None) }.map_err(GfxError::vk("create instance"))?;

        Ok(Self { ash_instance: handle })
    }

    pub fn destroy(self) {
        log::info!("destroying GfxInstance");
        unsafe {
            self.ash_instance.destroy_instance(None);
        }
    }
}

// getters
impl GfxInstance {
    #[inline]
    pub fn ash_instance(&self) -> &ash::Instance {
        &self.ash_instance
    }

    #[inline]
    pub fn vk_instance(&self) -> vk::Instance {
        self.ash_instance.handle()
    }
}

// 构造过程
impl GfxInstance {
    /// instance 所需的，且受支持的 extension
    fn get_extensions(vk_entry: &ash::Entry, extra_instance_exts: &[*const c_char]) -> GfxResult<Vec<*const c_char>> {
        let all_ext_props = unsafe { vk_entry.enumerate_instance_extension_properties(None) }
            .map_err(GfxError::vk("enumerate instance extensions"))?;

        let required = extra_instance_exts
            .iter()
            .map(|ext| unsafe { CStr::from_ptr(*ext) })
            .chain(Self::basic_instance_exts())
            .unique()
            .collect_vec();

        for ext in &required {
            let supported = all_ext_props.iter().any(|supported_ext| {
                supported_ext.extension_name_as_c_str().is_ok_and(|supported_name| supported_name == *ext)
            });
            if !supported {
                return Err(GfxError::MissingExtension {
                    kind: "instance extension",
                    name: ext.to_string_lossy().into_owned(),
                });
            }
        }

        Ok(required.iter().map(|ext| ext.as_ptr()).collect_vec())
    }

    /// instance 所需的所有 layers
    fn get_layers(vk_entry: &ash::Entry, enable_validation: bool) -> GfxResult<Vec<&'static CStr>> {
        if !enable_validation {
            return Ok(Vec::new());
        }

        let all_layer_props = unsafe { vk_entry.enumerate_instance_layer_properties() }
            .map_err(GfxError::vk("enumerate instance layers"))?;
        let is_supported = all_layer_props
            .iter()
            .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER));
        if is_supported {
            Ok(vec![VALIDATION_LAYER])
        } else {
            log::warn!("{:?} is not installed, continue without validation", VALIDATION_LAYER);
            Ok(Vec::new())
        }
    }

    /// 必须要开启的 instance extensions
    fn basic_instance_exts() -> Vec<&'static CStr> {
        vec![
            // 这个 extension 可以单独使用，提供以下功能：
            // 1. debug messenger
            // 2. 为 vulkan object 设置 debug name
            // 3. 使用 label 标记 queue 或者 command buffer 中的一个一个 section
            ash::ext::debug_utils::NAME,
        ]
    }
}
