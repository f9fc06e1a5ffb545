use ash::vk;

use crate::backend::FrameBackend;
use crate::chain_builder::{ChainBuilder, RebuildStatus};
use crate::error::{FrameError, FrameResult, FrameStep};
use crate::frame_counter::FrameCounter;
use crate::frame_settings::FrameSettings;
use crate::frame_slot::FrameSlotPool;
use crate::presentable_chain::{AcquireStatus, PresentStatus, PresentableChain};

/// FrameScheduler 当前所处的阶段
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    WaitingForSlot,
    Acquiring,
    Rebuilding,
    /// begin_frame 已经返回，调用者正在录制命令
    Recording,
    Submitting,
    Presenting,
    /// 出现过 fatal error，不再处理任何帧
    Halted,
}

impl FramePhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitingForSlot => "waiting for slot",
            Self::Acquiring => "acquiring",
            Self::Rebuilding => "rebuilding",
            Self::Recording => "recording",
            Self::Submitting => "submitting",
            Self::Presenting => "presenting",
            Self::Halted => "halted",
        }
    }
}

/// 这一帧绑定在一起的 FrameSlot 和 image
///
/// slot_index 是 `frame_id mod N`，image_index 由平台决定，两者没有关系
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameTarget {
    pub frame_id: u64,
    pub slot_index: usize,
    pub image_index: u32,
    pub chain_generation: u64,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub image: vk::Image,
}

/// 帧被跳过的原因，都不是错误
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 窗口层通知了最小化
    Minimized,
    /// surface 面积为 0，无法构建 chain
    SurfaceNotReady,
    /// rebuild 之后 acquire 仍然报告 stale
    StillStale,
}

pub enum FrameBegin {
    Ready(FrameTarget),
    /// 帧计数器已经前进
    Skipped(SkipReason),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameEnd {
    Presented,
    /// 已经提交并 present，chain 会在下一帧 acquire 之前 rebuild
    PresentedStale,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    PresentedStale,
    Skipped(SkipReason),
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub submitted: u64,
    pub presented: u64,
    pub skipped: u64,
    /// 成功 rebuild 的次数，不包括 NotReady
    pub rebuilds: u64,
}

/// 驱动每一帧的 wait -> acquire -> record -> submit -> present
///
/// 只能由一个线程使用，GPU 上的并发完全由 fence 和 semaphore 表达
pub struct FrameScheduler<B: FrameBackend> {
    backend: B,
    settings: FrameSettings,
    builder: ChainBuilder,

    slots: FrameSlotPool<B>,
    chain: PresentableChain<B>,
    frame_counter: FrameCounter,

    /// 窗口层报告的尺寸，rebuild 时使用
    desired_extent: vk::Extent2D,
    minimized: bool,

    phase: FramePhase,
    /// 只在 Recording 阶段有值
    current: Option<FrameTarget>,

    stats: FrameStats,
}

// new & init
impl<B: FrameBackend> FrameScheduler<B> {
    pub fn new(mut backend: B, settings: FrameSettings, initial_extent: vk::Extent2D) -> FrameResult<Self> {
        settings.validate()?;

        let builder = ChainBuilder::new(
            settings.preferred_surface_formats_vk(),
            settings.present_modes_vk(),
            settings.frames_in_flight,
        );
        let slots = FrameSlotPool::create(&mut backend, settings.frames_in_flight)?;
        let chain = match builder.create(&mut backend, initial_extent) {
            Ok(chain) => chain,
            Err(err) => {
                if let Err(destroy_err) = slots.destroy_all(&mut backend, settings.fence_timeout_ns()) {
                    log::error!("failed to destroy frame slots: {}", destroy_err);
                }
                return Err(err);
            }
        };

        log::info!(
            "frame scheduler created: {} frames in flight, present modes {}",
            settings.frames_in_flight,
            builder.describe_present_modes()
        );

        Ok(Self {
            frame_counter: FrameCounter::new(0, settings.frames_in_flight),
            backend,
            settings,
            builder,
            slots,
            chain,
            desired_extent: initial_extent,
            minimized: false,
            phase: FramePhase::Idle,
            current: None,
            stats: FrameStats::default(),
        })
    }
}

// getters
impl<B: FrameBackend> FrameScheduler<B> {
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
    #[inline]
    pub fn settings(&self) -> &FrameSettings {
        &self.settings
    }
    #[inline]
    pub fn chain(&self) -> &PresentableChain<B> {
        &self.chain
    }
    #[inline]
    pub fn frame_counter(&self) -> &FrameCounter {
        &self.frame_counter
    }
    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }
    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// 只在 begin_frame 和 end_frame 之间有值
    #[inline]
    pub fn current_slot_index(&self) -> Option<usize> {
        self.current.map(|target| target.slot_index)
    }
    /// 只在 begin_frame 和 end_frame 之间有值
    #[inline]
    pub fn current_image_index(&self) -> Option<u32> {
        self.current.map(|target| target.image_index)
    }
    #[inline]
    pub fn current_target(&self) -> Option<&FrameTarget> {
        self.current.as_ref()
    }
    pub fn current_command_buffer(&self) -> Option<&B::CommandBuffer> {
        self.current.map(|target| &self.slots.get(target.slot_index).command_buffer)
    }
}

// window events
impl<B: FrameBackend> FrameScheduler<B> {
    /// 窗口尺寸变化；chain 会在下一次 acquire 之前 rebuild，这里不会同步 rebuild
    pub fn notify_resized(&mut self, extent: vk::Extent2D) {
        log::debug!("resized to {}x{}", extent.width, extent.height);
        self.desired_extent = extent;
        self.chain.mark_stale();
    }

    pub fn set_minimized(&mut self, minimized: bool) {
        self.minimized = minimized;
    }
}

// frame cycle
impl<B: FrameBackend> FrameScheduler<B> {
    /// 等待 slot，获取 image，并开始录制 command buffer
    pub fn begin_frame(&mut self) -> FrameResult<FrameBegin> {
        match self.phase {
            FramePhase::Idle => {}
            FramePhase::Halted => return Err(FrameError::Halted),
            phase => {
                return Err(FrameError::OutOfPhase {
                    expected: FramePhase::Idle.name(),
                    actual: phase.name(),
                });
            }
        }

        let result = self.begin_frame_inner();
        self.halt_on_error(result)
    }

    fn begin_frame_inner(&mut self) -> FrameResult<FrameBegin> {
        if self.minimized {
            return Ok(self.skip(SkipReason::Minimized));
        }

        let slot_index = self.frame_counter.slot_index();

        // 同一个 slot 的上一次提交完成之前，不能重新录制它的 command buffer
        self.phase = FramePhase::WaitingForSlot;
        let fence_timeout_ns = self.settings.fence_timeout_ns();
        self.backend
            .wait_fence(&self.slots.get(slot_index).completion_fence, fence_timeout_ns)
            .map_err(|result| FrameError::from_wait(FrameStep::WaitingForSlot, fence_timeout_ns, result))?;

        self.phase = FramePhase::Acquiring;
        let image_index = match self.acquire_image(slot_index)? {
            Ok(image_index) => image_index,
            Err(reason) => return Ok(self.skip(reason)),
        };

        self.phase = FramePhase::Recording;
        let frame_name = self.frame_counter.frame_name();
        self.backend
            .begin_command_buffer(&self.slots.get(slot_index).command_buffer, &frame_name)
            .map_err(FrameError::lost(FrameStep::Recording))?;

        let target = FrameTarget {
            frame_id: self.frame_counter.frame_id(),
            slot_index,
            image_index,
            chain_generation: self.chain.generation(),
            extent: self.chain.extent(),
            format: self.chain.format(),
            image: self.chain.image(image_index).image,
        };
        log::debug!("{} begin: image {}, generation {}", frame_name, image_index, target.chain_generation);
        self.current = Some(target);
        Ok(FrameBegin::Ready(target))
    }

    /// acquire，stale 时 rebuild 并重试一次；返回 Err(SkipReason) 表示这一帧需要跳过
    fn acquire_image(&mut self, slot_index: usize) -> FrameResult<Result<u32, SkipReason>> {
        let acquire_timeout_ns = self.settings.acquire_timeout_ns();
        let mut rebuilt = false;
        loop {
            let image_ready = &self.slots.get(slot_index).image_ready;
            match self.chain.acquire(&mut self.backend, acquire_timeout_ns, image_ready) {
                AcquireStatus::Ready { image_index } => return Ok(Ok(image_index)),
                AcquireStatus::TimedOut => {
                    return Err(FrameError::Timeout {
                        step: FrameStep::Acquiring,
                        timeout_ns: acquire_timeout_ns,
                    });
                }
                AcquireStatus::Lost(result) => {
                    return Err(FrameError::Lost {
                        step: FrameStep::Acquiring,
                        result,
                    });
                }
                AcquireStatus::Stale if rebuilt => return Ok(Err(SkipReason::StillStale)),
                AcquireStatus::Stale => {
                    self.phase = FramePhase::Rebuilding;
                    match self.builder.rebuild(&mut self.chain, &mut self.backend, self.desired_extent)? {
                        RebuildStatus::NotReady => return Ok(Err(SkipReason::SurfaceNotReady)),
                        RebuildStatus::Rebuilt { generation } => {
                            log::info!("{} chain rebuilt, generation {}", self.frame_counter.frame_name(), generation);
                            self.stats.rebuilds += 1;
                        }
                    }
                    self.phase = FramePhase::Acquiring;
                    rebuilt = true;
                }
            }
        }
    }

    /// 结束录制，提交到 graphics queue，然后 present
    pub fn end_frame(&mut self) -> FrameResult<FrameEnd> {
        match self.phase {
            FramePhase::Recording => {}
            FramePhase::Halted => return Err(FrameError::Halted),
            phase => {
                return Err(FrameError::OutOfPhase {
                    expected: FramePhase::Recording.name(),
                    actual: phase.name(),
                });
            }
        }

        let result = self.end_frame_inner();
        self.halt_on_error(result)
    }

    fn end_frame_inner(&mut self) -> FrameResult<FrameEnd> {
        let Some(target) = self.current.take() else {
            return Err(FrameError::OutOfPhase {
                expected: FramePhase::Recording.name(),
                actual: FramePhase::Idle.name(),
            });
        };
        let slot = self.slots.get(target.slot_index);

        self.phase = FramePhase::Submitting;
        self.backend.end_command_buffer(&slot.command_buffer).map_err(FrameError::lost(FrameStep::Recording))?;
        // fence 在提交之前才 reset，保证一个未 signal 的 fence 一定对应着一次提交
        self.backend.reset_fence(&slot.completion_fence).map_err(FrameError::lost(FrameStep::Submitting))?;
        self.backend
            .submit(&slot.command_buffer, &slot.image_ready, &slot.work_complete, &slot.completion_fence)
            .map_err(FrameError::lost(FrameStep::Submitting))?;
        self.stats.submitted += 1;

        // present 返回 stale 时不能立即 rebuild：刚刚提交的工作还在使用旧的 image
        self.phase = FramePhase::Presenting;
        let end = match self.chain.present(&mut self.backend, target.image_index, &slot.work_complete) {
            PresentStatus::Ready => FrameEnd::Presented,
            PresentStatus::Stale => FrameEnd::PresentedStale,
            PresentStatus::Lost(result) => {
                return Err(FrameError::Lost {
                    step: FrameStep::Presenting,
                    result,
                });
            }
        };
        self.stats.presented += 1;

        log::debug!("{} end: {:?}", self.frame_counter.frame_name(), end);
        self.frame_counter.next_frame();
        self.phase = FramePhase::Idle;
        Ok(end)
    }

    /// 完整的一帧，`record` 向 command buffer 中录制绘制命令
    ///
    /// `record` 返回的错误被视为 fatal
    pub fn run_frame<F>(&mut self, record: F) -> FrameResult<FrameOutcome>
    where
        F: FnOnce(&B, &FrameTarget, &B::CommandBuffer) -> FrameResult<()>,
    {
        let target = match self.begin_frame()? {
            FrameBegin::Ready(target) => target,
            FrameBegin::Skipped(reason) => return Ok(FrameOutcome::Skipped(reason)),
        };

        let command_buffer = &self.slots.get(target.slot_index).command_buffer;
        if let Err(err) = record(&self.backend, &target, command_buffer) {
            log::error!("{} recording failed: {}", self.frame_counter.frame_name(), err);
            self.current = None;
            self.phase = FramePhase::Halted;
            return Err(err);
        }

        Ok(match self.end_frame()? {
            FrameEnd::Presented => FrameOutcome::Presented,
            FrameEnd::PresentedStale => FrameOutcome::PresentedStale,
        })
    }

    fn skip(&mut self, reason: SkipReason) -> FrameBegin {
        log::debug!("{} skipped: {:?}", self.frame_counter.frame_name(), reason);
        self.stats.skipped += 1;
        self.frame_counter.next_frame();
        self.phase = FramePhase::Idle;
        FrameBegin::Skipped(reason)
    }

    fn halt_on_error<T>(&mut self, result: FrameResult<T>) -> FrameResult<T> {
        if let Err(err) = &result {
            log::error!("{} fatal: {}", self.frame_counter.frame_name(), err);
            self.current = None;
            self.phase = FramePhase::Halted;
        }
        result
    }
}

// destroy
impl<B: FrameBackend> FrameScheduler<B> {
    /// 等待 GPU 空闲，然后按顺序销毁 slot 和 chain，返回 backend 以便继续销毁 device
    pub fn destroy(self) -> FrameResult<B> {
        let Self {
            mut backend,
            settings,
            slots,
            chain,
            ..
        } = self;

        match backend.wait_idle() {
            Ok(()) => {}
            Err(vk::Result::ERROR_DEVICE_LOST) => log::warn!("device lost before shutdown"),
            Err(result) => {
                return Err(FrameError::Lost {
                    step: FrameStep::Shutdown,
                    result,
                });
            }
        }

        slots.destroy_all(&mut backend, settings.fence_timeout_ns())?;
        chain.destroy(&mut backend);
        log::info!("frame scheduler destroyed");
        Ok(backend)
    }
}
