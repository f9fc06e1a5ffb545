use std::fmt::Display;

use ash::vk;

/// 帧循环中的步骤，用于在 fatal error 中标记出错的位置
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameStep {
    Startup,
    WaitingForSlot,
    Acquiring,
    Rebuilding,
    Recording,
    Submitting,
    Presenting,
    Shutdown,
}

impl Display for FrameStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Startup => "startup",
            Self::WaitingForSlot => "waiting for frame slot",
            Self::Acquiring => "acquiring presentable image",
            Self::Rebuilding => "rebuilding presentable chain",
            Self::Recording => "recording commands",
            Self::Submitting => "submitting to graphics queue",
            Self::Presenting => "presenting",
            Self::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// frame pipeline 的错误类型
///
/// 可恢复的情况（chain stale、窗口最小化）不会出现在这里，会在 FrameScheduler 内部被吸收掉；
/// 这里的错误都是 fatal 的，调用者应该停止 render loop
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// 启动阶段创建 GPU 对象失败
    #[error("failed to create {what}: {result}")]
    Creation { what: String, result: vk::Result },

    /// fence 或 acquire 超时，视为 device hang
    #[error("device hang: timed out after {timeout_ns}ns while {step}")]
    Timeout { step: FrameStep, timeout_ns: u64 },

    /// surface 或 device lost，以及其他无法恢复的 vk::Result
    #[error("unrecoverable error while {step}: {result}")]
    Lost { step: FrameStep, result: vk::Result },

    /// 之前已经出现过 fatal error，scheduler 不再处理任何帧
    #[error("frame scheduler halted by an earlier fatal error")]
    Halted,

    #[error("invalid frame settings: {0}")]
    InvalidSettings(String),

    /// API 调用顺序错误，例如没有 begin_frame 就 end_frame
    #[error("frame api called out of phase: expected {expected}, found {actual}")]
    OutOfPhase { expected: &'static str, actual: &'static str },
}

impl FrameError {
    #[inline]
    pub fn creation(what: impl Into<String>, result: vk::Result) -> Self {
        Self::Creation {
            what: what.into(),
            result,
        }
    }

    /// 将 wait 类操作的 vk::Result 转换为 FrameError，TIMEOUT 会被识别为 device hang
    pub fn from_wait(step: FrameStep, timeout_ns: u64, result: vk::Result) -> Self {
        match result {
            vk::Result::TIMEOUT | vk::Result::NOT_READY => Self::Timeout { step, timeout_ns },
            result => Self::Lost { step, result },
        }
    }

    #[inline]
    pub fn lost(step: FrameStep) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Lost { step, result }
    }

    /// 出错的步骤；与具体步骤无关的错误返回 None
    pub fn step(&self) -> Option<FrameStep> {
        match self {
            Self::Creation { .. } => Some(FrameStep::Startup),
            Self::Timeout { step, .. } | Self::Lost { step, .. } => Some(*step),
            Self::Halted | Self::InvalidSettings(_) | Self::OutOfPhase { .. } => None,
        }
    }
}

pub type FrameResult<T> = Result<T, FrameError>;
