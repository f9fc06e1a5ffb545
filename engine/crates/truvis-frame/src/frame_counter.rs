/// 帧计数器，只由 FrameScheduler 持有和推进
///
/// 每一帧结束（正常提交或者被跳过）都会前进 1
pub struct FrameCounter {
    /// 当前的帧序号，一直累加
    frame_id: u64,
    /// frames in flight 的数量，也就是 FrameSlot 的数量
    fif_count: usize,
}
// new & init
impl FrameCounter {
    pub fn new(init_frame_id: u64, fif_count: usize) -> Self {
        assert!(fif_count > 0, "frames in flight must be at least 1");
        Self {
            frame_id: init_frame_id,
            fif_count,
        }
    }
}
// update
impl FrameCounter {
    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}
// getters
impl FrameCounter {
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
    #[inline]
    pub fn fif_count(&self) -> usize {
        self.fif_count
    }
    /// 当前帧使用的 FrameSlot，也就是 `frame_id mod N`
    #[inline]
    pub fn slot_index(&self) -> usize {
        (self.frame_id % self.fif_count as u64) as usize
    }
    #[inline]
    pub fn frame_label(&self) -> String {
        Self::label_of(self.slot_index())
    }
    /// 例如：`[F12B]`
    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}{}]", self.frame_id, self.frame_label())
    }

    /// slot 的可读名字：A, B, C ... Z，超过 26 个之后使用数字
    pub fn label_of(slot_index: usize) -> String {
        if slot_index < 26 {
            char::from(b'A' + slot_index as u8).to_string()
        } else {
            slot_index.to_string()
        }
    }
}
