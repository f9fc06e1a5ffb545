use ash::vk;
use serde::Deserialize;

use crate::error::FrameError;

/// frame pipeline 的默认配置
pub struct DefaultFrameSettings;
impl DefaultFrameSettings {
    pub const FRAMES_IN_FLIGHT: usize = 2;
    pub const DEFAULT_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        // shader 输出会被自动改变： liner -> sRGB
        format: vk::Format::B8G8R8A8_SRGB,
        // 通知 OS，将数值按照 sRGB 空间进行处理和显示
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    /// 等待 frame slot 的 fence，超过这个时间视为 device hang
    pub const FENCE_TIMEOUT_MS: u64 = 5_000;
    pub const ACQUIRE_TIMEOUT_MS: u64 = 1_000;
    pub const FRAME_LIMIT: f32 = 120.0;
    /// 低于这个帧率时帧间隔过长，窗口会看起来像卡死
    pub const MIN_FRAME_LIMIT: f32 = 1.0;
}

/// 可以出现在配置文件中的 surface format
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceFormatSetting {
    Bgra8Srgb,
    Rgba8Srgb,
    Bgra8Unorm,
    Rgba8Unorm,
}
impl SurfaceFormatSetting {
    pub fn to_vk(self) -> vk::SurfaceFormatKHR {
        let format = match self {
            Self::Bgra8Srgb => vk::Format::B8G8R8A8_SRGB,
            Self::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
            Self::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
            Self::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        };
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }
}

/// present mode 的偏好
///
/// 低延迟（mailbox / immediate）和无撕裂（fifo）之间没有固定的取舍，由配置决定
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeSetting {
    Immediate,
    Mailbox,
    Fifo,
    FifoRelaxed,
}
impl PresentModeSetting {
    pub fn to_vk(self) -> vk::PresentModeKHR {
        match self {
            Self::Immediate => vk::PresentModeKHR::IMMEDIATE,
            Self::Mailbox => vk::PresentModeKHR::MAILBOX,
            Self::Fifo => vk::PresentModeKHR::FIFO,
            Self::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
        }
    }
}

/// frame pipeline 的配置，可以从 toml 中读取，缺失的字段使用默认值
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    /// frames in flight 的数量 N
    pub frames_in_flight: usize,
    /// 按照优先级排列
    pub preferred_surface_formats: Vec<SurfaceFormatSetting>,
    /// 按照优先级排列，全都不支持时使用 fifo
    pub present_modes: Vec<PresentModeSetting>,
    pub fence_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
    /// 是否开启 VK_LAYER_KHRONOS_validation
    pub enable_validation: bool,
    /// 每秒最多渲染多少帧，由窗口层控制
    pub frame_limit: f32,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            frames_in_flight: DefaultFrameSettings::FRAMES_IN_FLIGHT,
            preferred_surface_formats: vec![SurfaceFormatSetting::Bgra8Srgb],
            present_modes: vec![PresentModeSetting::Mailbox, PresentModeSetting::Fifo],
            fence_timeout_ms: DefaultFrameSettings::FENCE_TIMEOUT_MS,
            acquire_timeout_ms: DefaultFrameSettings::ACQUIRE_TIMEOUT_MS,
            enable_validation: cfg!(debug_assertions),
            frame_limit: DefaultFrameSettings::FRAME_LIMIT,
        }
    }
}

// getters
impl FrameSettings {
    #[inline]
    pub fn fence_timeout_ns(&self) -> u64 {
        self.fence_timeout_ms.saturating_mul(1_000_000)
    }
    #[inline]
    pub fn acquire_timeout_ns(&self) -> u64 {
        self.acquire_timeout_ms.saturating_mul(1_000_000)
    }
    pub fn preferred_surface_formats_vk(&self) -> Vec<vk::SurfaceFormatKHR> {
        if self.preferred_surface_formats.is_empty() {
            vec![DefaultFrameSettings::DEFAULT_SURFACE_FORMAT]
        } else {
            self.preferred_surface_formats.iter().map(|f| f.to_vk()).collect()
        }
    }
    pub fn present_modes_vk(&self) -> Vec<vk::PresentModeKHR> {
        self.present_modes.iter().map(|m| m.to_vk()).collect()
    }
}

// tools
impl FrameSettings {
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.frames_in_flight == 0 {
            return Err(FrameError::InvalidSettings("frames_in_flight must be at least 1".to_string()));
        }
        // 超时必须是有限的，否则 hang 住的驱动会让进程永远卡住
        if self.fence_timeout_ms == 0 || self.fence_timeout_ms == u64::MAX {
            return Err(FrameError::InvalidSettings(format!(
                "fence_timeout_ms must be finite and non-zero, got {}",
                self.fence_timeout_ms
            )));
        }
        // 0 会让 acquire 变成非阻塞查询，没有可用 image 时直接变成 fatal 的 timeout
        if self.acquire_timeout_ms == 0 || self.acquire_timeout_ms == u64::MAX {
            return Err(FrameError::InvalidSettings(format!(
                "acquire_timeout_ms must be finite and non-zero, got {}",
                self.acquire_timeout_ms
            )));
        }
        if !self.frame_limit.is_finite() || self.frame_limit < DefaultFrameSettings::MIN_FRAME_LIMIT {
            return Err(FrameError::InvalidSettings(format!(
                "frame_limit must be finite and at least {}, got {}",
                DefaultFrameSettings::MIN_FRAME_LIMIT,
                self.frame_limit
            )));
        }
        Ok(())
    }
}
