//! 帧循环与呈现管线
//!
//! - [`frame_slot::FrameSlotPool`]：N 组 frames in flight 的同步对象与 command buffer
//! - [`presentable_chain::PresentableChain`]：swapchain 以及它的 image，带有 generation 和 stale 标记
//! - [`chain_builder::ChainBuilder`]：根据 surface 能力选择配置，并且原地重建 chain
//! - [`frame_scheduler::FrameScheduler`]：每一帧的 wait、acquire、record、submit、present
//!
//! GPU 能力通过 [`backend::FrameBackend`] 抽象，Vulkan 实现为 [`vulkan_backend::VulkanFrameBackend`]。

pub mod backend;
pub mod chain_builder;
pub mod error;
pub mod frame_counter;
pub mod frame_scheduler;
pub mod frame_settings;
pub mod frame_slot;
pub mod presentable_chain;
pub mod vulkan_backend;

#[cfg(test)]
mod headless;
