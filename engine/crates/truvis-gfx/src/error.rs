use ash::vk;

/// GFX 层在初始化阶段的错误，全部是 fatal 的
#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    #[error("failed to load vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("{context}: {result}")]
    Vulkan { context: &'static str, result: vk::Result },

    /// 没有任何一张显卡同时支持 graphics queue 和 present
    #[error("no physical device supports both graphics and presentation to this surface")]
    NoSuitableDevice,

    #[error("required {kind} is not supported: {name}")]
    MissingExtension { kind: &'static str, name: String },
}

impl GfxError {
    /// 用于 `map_err`，为 vk::Result 附加上下文
    #[inline]
    pub fn vk(context: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Vulkan { context, result }
    }
}

pub type GfxResult<T> = Result<T, GfxError>;
