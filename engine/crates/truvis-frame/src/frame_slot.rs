use crate::backend::FrameBackend;
use crate::error::{FrameError, FrameResult, FrameStep};
use crate::frame_counter::FrameCounter;

/// 一个 frame in flight 所需要的全部同步对象和命令缓冲
///
/// command buffer 只有在 completion fence 被 signal 之后才能重新录制
pub struct FrameSlot<B: FrameBackend> {
    /// GPU 完成了该 slot 提交的所有工作时被 signal，CPU 在这上面等待
    pub completion_fence: B::Fence,
    /// acquire 成功后被 signal，submit 在执行前等待它
    pub image_ready: B::Semaphore,
    /// submit 完成后被 signal，present 等待它
    pub work_complete: B::Semaphore,
    pub command_buffer: B::CommandBuffer,

    label: String,
}

impl<B: FrameBackend> FrameSlot<B> {
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    fn destroy(self, backend: &mut B) {
        backend.free_command_buffer(self.command_buffer);
        backend.destroy_semaphore(self.image_ready);
        backend.destroy_semaphore(self.work_complete);
        backend.destroy_fence(self.completion_fence);
    }
}

/// 固定数量的 FrameSlot，启动时全部创建，退出时全部销毁
pub struct FrameSlotPool<B: FrameBackend> {
    slots: Vec<FrameSlot<B>>,
}

// new & init
impl<B: FrameBackend> FrameSlotPool<B> {
    /// 创建 n 个 FrameSlot，fence 处于 signaled 状态，因此前 n 帧不会阻塞
    ///
    /// 任何一个对象创建失败都是 fatal 的：已经创建的对象会被销毁，然后返回错误
    pub fn create(backend: &mut B, n: usize) -> FrameResult<Self> {
        if n == 0 {
            return Err(FrameError::InvalidSettings("frame slot pool needs at least one slot".to_string()));
        }

        let mut slots = Vec::with_capacity(n);
        for index in 0..n {
            match Self::create_slot(backend, index) {
                Ok(slot) => slots.push(slot),
                Err(err) => {
                    log::error!("failed to create frame slot {}: {}", FrameCounter::label_of(index), err);
                    // 新创建的对象还没有被提交过，可以直接销毁
                    for slot in slots.drain(..) {
                        slot.destroy(backend);
                    }
                    return Err(err);
                }
            }
        }

        log::info!("created {} frame slots", n);
        Ok(Self { slots })
    }

    fn create_slot(backend: &mut B, index: usize) -> FrameResult<FrameSlot<B>> {
        let label = FrameCounter::label_of(index);

        let fence_name = format!("frame-fence-{label}");
        let completion_fence =
            backend.create_fence(true, &fence_name).map_err(|result| FrameError::creation(fence_name, result))?;

        let image_ready_name = format!("image-ready-{label}");
        let image_ready = match backend.create_semaphore(&image_ready_name) {
            Ok(semaphore) => semaphore,
            Err(result) => {
                backend.destroy_fence(completion_fence);
                return Err(FrameError::creation(image_ready_name, result));
            }
        };

        let work_complete_name = format!("work-complete-{label}");
        let work_complete = match backend.create_semaphore(&work_complete_name) {
            Ok(semaphore) => semaphore,
            Err(result) => {
                backend.destroy_semaphore(image_ready);
                backend.destroy_fence(completion_fence);
                return Err(FrameError::creation(work_complete_name, result));
            }
        };

        let command_buffer_name = format!("frame-cmd-{label}");
        let command_buffer = match backend.allocate_command_buffer(&command_buffer_name) {
            Ok(command_buffer) => command_buffer,
            Err(result) => {
                backend.destroy_semaphore(work_complete);
                backend.destroy_semaphore(image_ready);
                backend.destroy_fence(completion_fence);
                return Err(FrameError::creation(command_buffer_name, result));
            }
        };

        Ok(FrameSlot {
            completion_fence,
            image_ready,
            work_complete,
            command_buffer,
            label,
        })
    }
}

// getters
impl<B: FrameBackend> FrameSlotPool<B> {
    /// 不要跨越 chain rebuild 持有返回的引用
    #[inline]
    pub fn get(&self, index: usize) -> &FrameSlot<B> {
        &self.slots[index]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// destroy
impl<B: FrameBackend> FrameSlotPool<B> {
    /// 等待所有的 fence 完成，然后销毁所有的 GPU 对象
    ///
    /// device lost 时 GPU 不会再执行任何工作，视为已经排空；超时则不会销毁任何对象
    pub fn destroy_all(self, backend: &mut B, timeout_ns: u64) -> FrameResult<()> {
        for slot in &self.slots {
            match backend.wait_fence(&slot.completion_fence, timeout_ns) {
                Ok(()) => {}
                Err(ash::vk::Result::ERROR_DEVICE_LOST) => {
                    log::warn!("device lost while draining frame slot {}", slot.label);
                }
                Err(result) => return Err(FrameError::from_wait(FrameStep::Shutdown, timeout_ns, result)),
            }
        }

        for slot in self.slots {
            slot.destroy(backend);
        }
        Ok(())
    }
}
