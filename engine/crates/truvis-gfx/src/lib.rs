//! Vulkan GFX 封装层
//!
//! 提供呈现一个窗口所需的 Vulkan 对象：instance、device、surface、swapchain、命令以及同步原语。
//! 所有对象通过 `Rc<GfxDevice>` 访问设备函数指针，需要调用者按照依赖顺序显式销毁。

pub mod basic;
pub mod commands;
pub mod error;
pub mod foundation;
pub mod gfx_core;
pub mod resources;
pub mod swapchain;
