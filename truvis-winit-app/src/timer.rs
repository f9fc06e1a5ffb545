use std::time::{Duration, Instant};

/// 帧计时，同时用于限制帧率
#[derive(Debug)]
pub struct Timer {
    last_tick: Instant,
    total_time: Duration,
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            last_tick: Instant::now(),
            total_time: Duration::ZERO,
        }
    }
}

// update
impl Timer {
    /// 每帧开始的时候调用
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.total_time += now.duration_since(self.last_tick);
        self.last_tick = now;
    }
}

// getters
impl Timer {
    pub fn elapsed_since_tick(&self) -> Duration {
        self.last_tick.elapsed()
    }

    /// 距离上一次 tick 是否已经超过了一帧的时间
    ///
    /// 帧间隔无法用 Duration 表示时（0、负数、NaN 或极小的帧率）不做限制
    pub fn time_to_render(&self, frame_limit: f32) -> bool {
        match Self::frame_interval(frame_limit) {
            Some(interval) => interval <= self.elapsed_since_tick(),
            None => true,
        }
    }

    /// 总运行时间
    #[inline]
    pub fn total_time_s(&self) -> f32 {
        self.total_time.as_secs_f32()
    }
}

// tools
impl Timer {
    #[inline]
    fn frame_interval(frame_limit: f32) -> Option<Duration> {
        Duration::try_from_secs_f32(1.0 / frame_limit).ok()
    }
}
