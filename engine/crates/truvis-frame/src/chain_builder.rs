use ash::vk;
use itertools::Itertools;

use crate::backend::{ChainConfig, FrameBackend, SurfaceSupport};
use crate::error::{FrameError, FrameResult, FrameStep};
use crate::presentable_chain::{PresentableChain, PresentableImage};

/// rebuild 的结果
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RebuildStatus {
    Rebuilt { generation: u64 },
    /// surface 当前无法构建 chain（例如窗口最小化），这一帧应该跳过，下一帧重试
    NotReady,
}

/// 根据 surface 的能力和偏好构建 PresentableChain
pub struct ChainBuilder {
    /// 按照优先级排列
    preferred_formats: Vec<vk::SurfaceFormatKHR>,
    /// 按照优先级排列，都不支持时使用 FIFO（所有平台都必须支持）
    present_modes: Vec<vk::PresentModeKHR>,
    /// frames in flight 的数量，image 数量至少为它
    frames_in_flight: u32,
}

// new & init
impl ChainBuilder {
    pub fn new(
        preferred_formats: Vec<vk::SurfaceFormatKHR>,
        present_modes: Vec<vk::PresentModeKHR>,
        frames_in_flight: usize,
    ) -> Self {
        Self {
            preferred_formats,
            present_modes,
            frames_in_flight: frames_in_flight as u32,
        }
    }
}

// tools
impl ChainBuilder {
    fn choose_surface_format(&self, formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
        // 只有一个 UNDEFINED 表示平台没有偏好，可以使用任意 format
        if formats.len() == 1 && formats[0].format == vk::Format::UNDEFINED {
            if let Some(preferred) = self.preferred_formats.first() {
                return *preferred;
            }
        }
        self.preferred_formats
            .iter()
            .find(|preferred| formats.contains(preferred))
            .copied()
            .unwrap_or(formats[0])
    }

    fn choose_present_mode(&self, present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
        self.present_modes
            .iter()
            .find(|mode| present_modes.contains(mode))
            .copied()
            .unwrap_or(vk::PresentModeKHR::FIFO)
    }

    fn choose_image_count(&self, capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
        let image_count = (capabilities.min_image_count + 1).max(self.frames_in_flight);
        // max_image_count 为 0 表示没有上限
        if capabilities.max_image_count > 0 {
            image_count.min(capabilities.max_image_count)
        } else {
            image_count
        }
    }

    /// current_extent 为 u32::MAX 时由 chain 决定大小，使用窗口大小并限制在 surface 的范围内
    fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, desired: vk::Extent2D) -> vk::Extent2D {
        let current = capabilities.current_extent;
        if current.width != u32::MAX && current.height != u32::MAX {
            return current;
        }
        // 不用 clamp：驱动报告的 min 大于 max 时 clamp 会 panic
        let (min, max) = (capabilities.min_image_extent, capabilities.max_image_extent);
        vk::Extent2D {
            width: desired.width.min(max.width).max(min.width),
            height: desired.height.min(max.height).max(min.height),
        }
    }

    fn choose_composite_alpha(capabilities: &vk::SurfaceCapabilitiesKHR) -> vk::CompositeAlphaFlagsKHR {
        [
            vk::CompositeAlphaFlagsKHR::OPAQUE,
            vk::CompositeAlphaFlagsKHR::INHERIT,
            vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
            vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        ]
        .into_iter()
        .find(|alpha| capabilities.supported_composite_alpha.contains(*alpha))
        .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
    }

    /// 确定 chain 的逻辑配置，不会创建任何对象
    ///
    /// 面积为 0 时返回 None
    pub fn choose_configuration(
        &self,
        support: &SurfaceSupport,
        desired_extent: vk::Extent2D,
    ) -> FrameResult<Option<ChainConfig>> {
        let capabilities = &support.capabilities;
        if desired_extent.width == 0 || desired_extent.height == 0 {
            return Ok(None);
        }
        let extent = Self::choose_extent(capabilities, desired_extent);
        if extent.width == 0 || extent.height == 0 {
            return Ok(None);
        }

        if support.formats.is_empty() {
            return Err(FrameError::Lost {
                step: FrameStep::Rebuilding,
                result: vk::Result::ERROR_FORMAT_NOT_SUPPORTED,
            });
        }

        Ok(Some(ChainConfig {
            extent,
            surface_format: self.choose_surface_format(&support.formats),
            present_mode: self.choose_present_mode(&support.present_modes),
            image_count: self.choose_image_count(capabilities),
            pre_transform: capabilities.current_transform,
            composite_alpha: Self::choose_composite_alpha(capabilities),
        }))
    }
}

// build
impl ChainBuilder {
    /// 启动时构建 chain；surface 不可用时得到一个 stale 的空 chain，第一帧会重试
    pub fn create<B: FrameBackend>(&self, backend: &mut B, desired_extent: vk::Extent2D) -> FrameResult<PresentableChain<B>> {
        let mut chain = PresentableChain::empty();
        match self.rebuild(&mut chain, backend, desired_extent)? {
            RebuildStatus::Rebuilt { .. } => {}
            RebuildStatus::NotReady => log::warn!("surface is not ready at startup, the chain will be built later"),
        }
        Ok(chain)
    }

    /// 原地重建 chain
    ///
    /// 先等待 device 空闲，保证旧的 image 不再被任何提交引用，然后再销毁它们
    pub fn rebuild<B: FrameBackend>(
        &self,
        chain: &mut PresentableChain<B>,
        backend: &mut B,
        desired_extent: vk::Extent2D,
    ) -> FrameResult<RebuildStatus> {
        let support = backend.surface_support().map_err(FrameError::lost(FrameStep::Rebuilding))?;
        let Some(config) = self.choose_configuration(&support, desired_extent)? else {
            log::warn!(
                "surface has zero area ({}x{}), skip rebuilding",
                desired_extent.width,
                desired_extent.height
            );
            chain.mark_stale();
            return Ok(RebuildStatus::NotReady);
        };

        backend.wait_idle().map_err(FrameError::lost(FrameStep::Rebuilding))?;

        let old_swapchain = chain.release_views(backend);
        chain.mark_stale();
        let new_swapchain = backend.create_swapchain(&config, old_swapchain.as_ref());
        // 不论新的 swapchain 是否创建成功，旧的都不再需要了
        if let Some(old_swapchain) = old_swapchain {
            backend.destroy_swapchain(old_swapchain);
        }
        let swapchain = new_swapchain.map_err(FrameError::lost(FrameStep::Rebuilding))?;

        let images = match Self::create_images(backend, &swapchain, &config) {
            Ok(images) => images,
            Err(err) => {
                backend.destroy_swapchain(swapchain);
                return Err(err);
            }
        };

        log::info!(
            "presentable chain built: generation {}, extent {}x{}, format {:?}, present mode {:?}, {} images",
            chain.generation() + 1,
            config.extent.width,
            config.extent.height,
            config.surface_format.format,
            config.present_mode,
            images.len()
        );
        chain.install(swapchain, images, config);
        Ok(RebuildStatus::Rebuilt {
            generation: chain.generation(),
        })
    }

    fn create_images<B: FrameBackend>(
        backend: &mut B,
        swapchain: &B::Swapchain,
        config: &ChainConfig,
    ) -> FrameResult<Vec<PresentableImage<B>>> {
        let images = backend.swapchain_images(swapchain).map_err(FrameError::lost(FrameStep::Rebuilding))?;

        let mut presentable = Vec::with_capacity(images.len());
        for (index, image) in images.into_iter().enumerate() {
            match backend.create_image_view(image, config.surface_format.format, &format!("swapchain-{index}")) {
                Ok(view) => presentable.push(PresentableImage { image, view }),
                Err(result) => {
                    for image in presentable.drain(..) {
                        backend.destroy_image_view(image.view);
                    }
                    return Err(FrameError::creation(format!("swapchain image view {index}"), result));
                }
            }
        }
        Ok(presentable)
    }

    /// 用于日志的描述，例如 `[MAILBOX, FIFO]`
    pub fn describe_present_modes(&self) -> String {
        format!("[{}]", self.present_modes.iter().map(|m| format!("{m:?}")).join(", "))
    }
}
