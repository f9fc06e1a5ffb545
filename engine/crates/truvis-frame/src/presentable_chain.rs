use ash::vk;

use crate::backend::{ChainConfig, FrameBackend};

/// chain 中的一张 image 以及它的 view
pub struct PresentableImage<B: FrameBackend> {
    pub image: vk::Image,
    pub view: B::ImageView,
}

/// acquire 的结果
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AcquireStatus {
    /// image_index 可用，image ready semaphore 会在 GPU 侧被 signal
    Ready { image_index: u32 },
    /// chain 与 surface 不匹配，需要 rebuild 之后重试；没有 image 被占用
    Stale,
    /// 在给定的时间内平台没有可用的 image
    TimedOut,
    /// 无法恢复
    Lost(vk::Result),
}

/// present 的结果
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PresentStatus {
    Ready,
    /// image 已经交给平台，但是 chain 需要在下一帧 rebuild
    Stale,
    Lost(vk::Result),
}

/// 从平台 surface 获得的一组可以显示的 image
///
/// 由 ChainBuilder 创建和原地 rebuild，identity 不变，每次 rebuild 之后 generation 增加
pub struct PresentableChain<B: FrameBackend> {
    pub(crate) swapchain: Option<B::Swapchain>,
    pub(crate) images: Vec<PresentableImage<B>>,
    pub(crate) config: Option<ChainConfig>,

    /// 每次 rebuild 增加 1，从未成功构建过的 chain 为 0
    pub(crate) generation: u64,
    /// 为 true 时下一次 acquire 之前必须 rebuild
    pub(crate) stale: bool,

    /// 只在 acquire 成功和对应的 present 之间有效
    current_image_index: Option<u32>,
}

// new & init
impl<B: FrameBackend> PresentableChain<B> {
    /// 还没有任何 image 的 chain，处于 stale 状态
    pub fn empty() -> Self {
        Self {
            swapchain: None,
            images: Vec::new(),
            config: None,
            generation: 0,
            stale: true,
            current_image_index: None,
        }
    }
}

// getters
impl<B: FrameBackend> PresentableChain<B> {
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }
    #[inline]
    pub fn config(&self) -> Option<&ChainConfig> {
        self.config.as_ref()
    }
    /// 逻辑尺寸，chain 还没有构建时为 0x0
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.config.map(|c| c.extent).unwrap_or_default()
    }
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.config.map(|c| c.surface_format.format).unwrap_or(vk::Format::UNDEFINED)
    }
    /// M，平台实际创建的 image 数量
    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
    #[inline]
    pub fn image(&self, index: u32) -> &PresentableImage<B> {
        &self.images[index as usize]
    }
    #[inline]
    pub fn current_image_index(&self) -> Option<u32> {
        self.current_image_index
    }
}

// update
impl<B: FrameBackend> PresentableChain<B> {
    /// 下一次 acquire 之前需要 rebuild，不会立即销毁任何资源
    #[inline]
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// 成功时 `signal` 会在 image 可用时被 GPU signal
    ///
    /// stale 的 chain 不会调用平台，直接返回 Stale
    pub fn acquire(&mut self, backend: &mut B, timeout_ns: u64, signal: &B::Semaphore) -> AcquireStatus {
        if self.stale {
            return AcquireStatus::Stale;
        }
        let Some(swapchain) = self.swapchain.as_ref() else {
            return AcquireStatus::Stale;
        };

        match backend.acquire_next_image(swapchain, timeout_ns, signal) {
            Ok((image_index, is_suboptimal)) => {
                if is_suboptimal {
                    // 这一帧仍然可以正常渲染和显示，之后再 rebuild
                    log::warn!("acquire: swapchain is suboptimal, rebuild after this frame");
                    self.stale = true;
                }
                self.current_image_index = Some(image_index);
                AcquireStatus::Ready { image_index }
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("acquire: swapchain is out of date");
                self.stale = true;
                AcquireStatus::Stale
            }
            Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => AcquireStatus::TimedOut,
            Err(result) => AcquireStatus::Lost(result),
        }
    }

    /// 在 `wait_on` 被 signal 之后显示 image
    ///
    /// 无论结果如何，current image index 都会失效
    pub fn present(&mut self, backend: &mut B, image_index: u32, wait_on: &B::Semaphore) -> PresentStatus {
        self.current_image_index = None;
        let Some(swapchain) = self.swapchain.as_ref() else {
            return PresentStatus::Lost(vk::Result::ERROR_OUT_OF_DATE_KHR);
        };

        match backend.present(swapchain, image_index, wait_on) {
            Ok(false) => PresentStatus::Ready,
            Ok(true) => {
                log::warn!("present: swapchain is suboptimal");
                self.stale = true;
                PresentStatus::Stale
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("present: swapchain is out of date");
                self.stale = true;
                PresentStatus::Stale
            }
            Err(result) => PresentStatus::Lost(result),
        }
    }

    /// 销毁所有的 view，返回旧的 swapchain 以便作为 old_swapchain 传给平台
    pub(crate) fn release_views(&mut self, backend: &mut B) -> Option<B::Swapchain> {
        for image in self.images.drain(..) {
            backend.destroy_image_view(image.view);
        }
        self.current_image_index = None;
        self.swapchain.take()
    }

    /// 安装新构建的 swapchain
    pub(crate) fn install(&mut self, swapchain: B::Swapchain, images: Vec<PresentableImage<B>>, config: ChainConfig) {
        self.swapchain = Some(swapchain);
        self.images = images;
        self.config = Some(config);
        self.generation += 1;
        self.stale = false;
        self.current_image_index = None;
    }
}

// destroy
impl<B: FrameBackend> PresentableChain<B> {
    /// 调用者需要保证 GPU 不再使用其中的 image
    pub fn destroy(mut self, backend: &mut B) {
        if let Some(swapchain) = self.release_views(backend) {
            backend.destroy_swapchain(swapchain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_builder::ChainBuilder;
    use crate::headless::HeadlessBackend;

    fn build(backend: &mut HeadlessBackend) -> PresentableChain<HeadlessBackend> {
        let builder = ChainBuilder::new(vec![], vec![vk::PresentModeKHR::FIFO], 2);
        let extent = backend.surface.current_extent;
        builder.create(backend, extent).unwrap()
    }

    #[test]
    fn test_empty_chain_is_stale() {
        let mut backend = HeadlessBackend::new();
        let semaphore = backend.create_semaphore("s").unwrap();
        let mut chain = PresentableChain::<HeadlessBackend>::empty();

        assert_eq!(chain.generation(), 0);
        assert_eq!(chain.acquire(&mut backend, 0, &semaphore), AcquireStatus::Stale);
        assert_eq!(backend.counters.acquires, 0);
        assert_eq!(chain.extent(), vk::Extent2D::default());
    }

    #[test]
    fn test_acquire_and_present() {
        let mut backend = HeadlessBackend::new();
        let semaphore = backend.create_semaphore("s").unwrap();
        let mut chain = build(&mut backend);

        let status = chain.acquire(&mut backend, 0, &semaphore);
        assert_eq!(status, AcquireStatus::Ready { image_index: 0 });
        assert_eq!(chain.current_image_index(), Some(0));

        // acquire signal 的 semaphore 直接给 present 使用
        assert_eq!(chain.present(&mut backend, 0, &semaphore), PresentStatus::Ready);
        assert_eq!(chain.current_image_index(), None);
        assert!(!chain.is_stale());

        chain.destroy(&mut backend);
        backend.destroy_semaphore(semaphore);
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    fn test_out_of_date_acquire_marks_stale() {
        let mut backend = HeadlessBackend::new();
        let semaphore = backend.create_semaphore("s").unwrap();
        let mut chain = build(&mut backend);

        backend.set_surface_extent(1024, 768);
        assert_eq!(chain.acquire(&mut backend, 0, &semaphore), AcquireStatus::Stale);
        assert!(chain.is_stale());
        assert_eq!(chain.current_image_index(), None);

        // 已经 stale 的 chain 不会再询问平台
        let acquires = backend.counters.acquires;
        assert_eq!(chain.acquire(&mut backend, 0, &semaphore), AcquireStatus::Stale);
        assert_eq!(backend.counters.acquires, acquires);
    }

    #[test]
    fn test_suboptimal_acquire_still_ready() {
        let mut backend = HeadlessBackend::new();
        let semaphore = backend.create_semaphore("s").unwrap();
        let mut chain = build(&mut backend);
        backend.acquire_script.insert(0, vk::Result::SUBOPTIMAL_KHR);

        assert_eq!(chain.acquire(&mut backend, 0, &semaphore), AcquireStatus::Ready { image_index: 0 });
        assert!(chain.is_stale());
    }

    #[test]
    fn test_acquire_failures() {
        let mut backend = HeadlessBackend::new();
        let semaphore = backend.create_semaphore("s").unwrap();
        let mut chain = build(&mut backend);
        backend.acquire_script.insert(0, vk::Result::TIMEOUT);
        backend.acquire_script.insert(1, vk::Result::ERROR_DEVICE_LOST);

        assert_eq!(chain.acquire(&mut backend, 0, &semaphore), AcquireStatus::TimedOut);
        assert_eq!(
            chain.acquire(&mut backend, 0, &semaphore),
            AcquireStatus::Lost(vk::Result::ERROR_DEVICE_LOST)
        );
        assert!(!chain.is_stale());
    }

    #[test]
    fn test_present_out_of_date_marks_stale() {
        let mut backend = HeadlessBackend::new();
        let semaphore = backend.create_semaphore("s").unwrap();
        let mut chain = build(&mut backend);
        backend.present_script.insert(0, vk::Result::ERROR_OUT_OF_DATE_KHR);
        backend.present_script.insert(1, vk::Result::ERROR_SURFACE_LOST_KHR);

        let AcquireStatus::Ready { image_index } = chain.acquire(&mut backend, 0, &semaphore) else {
            panic!("expected an image");
        };
        assert_eq!(chain.present(&mut backend, image_index, &semaphore), PresentStatus::Stale);
        assert!(chain.is_stale());
        // 不会同步 rebuild
        assert_eq!(chain.generation(), 1);
        assert_eq!(backend.counters.swapchains_created, 1);

        // 模拟下一帧，直接使用旧的 swapchain
        chain.stale = false;
        let AcquireStatus::Ready { image_index } = chain.acquire(&mut backend, 0, &semaphore) else {
            panic!("expected an image");
        };
        assert_eq!(
            chain.present(&mut backend, image_index, &semaphore),
            PresentStatus::Lost(vk::Result::ERROR_SURFACE_LOST_KHR)
        );
    }
}
