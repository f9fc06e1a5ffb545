//! 基于 winit 的窗口层，驱动 truvis-frame 的帧循环

pub mod app;
pub mod clear_screen;
pub mod cli;
pub mod timer;
