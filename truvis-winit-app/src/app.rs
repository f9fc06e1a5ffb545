use anyhow::Context;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use truvis_frame::frame_scheduler::{FrameOutcome, FrameScheduler};
use truvis_frame::frame_settings::FrameSettings;
use truvis_frame::vulkan_backend::VulkanFrameBackend;
use truvis_gfx::gfx_core::{GfxCore, GfxCoreDesc};
use winit::window::Window;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::WindowId,
};

use crate::clear_screen::ClearScreen;
use crate::timer::Timer;

pub struct UserEvent;

pub struct WinitApp {
    settings: FrameSettings,

    /// scheduler 持有的 surface 引用了 window，因此 window 需要最后销毁
    window: Option<Window>,
    scheduler: Option<FrameScheduler<VulkanFrameBackend>>,

    timer: Timer,
    /// 出现 fatal error 之后事件循环会退出，错误由 run 返回
    fatal_error: Option<anyhow::Error>,
}
// 总的 main 函数
impl WinitApp {
    /// 整个程序的入口
    pub fn run(settings: FrameSettings) -> anyhow::Result<()> {
        let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;

        let mut app = Self {
            settings,
            window: None,
            scheduler: None,
            timer: Timer::default(),
            fatal_error: None,
        };

        event_loop.run_app(&mut app)?;

        log::info!("end run.");

        let fatal_error = app.fatal_error.take();
        let destroy_result = app.destroy();
        match (fatal_error, destroy_result) {
            (Some(err), Err(destroy_err)) => {
                log::error!("failed to shutdown after fatal error: {:#}", destroy_err);
                Err(err)
            }
            (Some(err), Ok(())) => Err(err),
            (None, result) => result,
        }
    }
}
// new & init
impl WinitApp {
    /// 在 window 创建之后调用，初始化 Vulkan 和 FrameScheduler
    fn init_after_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attr = Window::default_attributes()
            .with_title("Truvis")
            .with_inner_size(winit::dpi::LogicalSize::new(1200.0, 800.0));
        let window = event_loop.create_window(window_attr)?;

        let core = GfxCore::new(
            &GfxCoreDesc {
                app_name: "truvis-clear-screen".to_string(),
                enable_validation: self.settings.enable_validation,
            },
            window.display_handle()?.as_raw(),
            window.window_handle()?.as_raw(),
        )
        .context("failed to initialize vulkan")?;
        let backend = VulkanFrameBackend::new(core)?;

        let size = window.inner_size();
        let mut scheduler = FrameScheduler::new(
            backend,
            self.settings.clone(),
            vk::Extent2D {
                width: size.width,
                height: size.height,
            },
        )?;
        scheduler.set_minimized(size.width == 0 || size.height == 0);

        self.scheduler = Some(scheduler);
        self.window = Some(window);
        Ok(())
    }
}
// update
impl WinitApp {
    fn on_resized(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        let Some(scheduler) = self.scheduler.as_mut() else {
            return;
        };
        let minimized = size.width == 0 || size.height == 0;
        scheduler.set_minimized(minimized);
        if !minimized {
            scheduler.notify_resized(vk::Extent2D {
                width: size.width,
                height: size.height,
            });
        }
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(scheduler) = self.scheduler.as_mut() else {
            return;
        };
        if !self.timer.time_to_render(self.settings.frame_limit) {
            return;
        }
        self.timer.tick();

        let color = ClearScreen::clear_color(self.timer.total_time_s());
        let result = scheduler.run_frame(|_backend, target, cmd| {
            ClearScreen::record(cmd, target, color);
            Ok(())
        });

        match result {
            Ok(FrameOutcome::Presented) => {}
            Ok(FrameOutcome::PresentedStale) => log::debug!("presented to a stale chain, rebuild on next frame"),
            Ok(FrameOutcome::Skipped(reason)) => log::trace!("frame skipped: {:?}", reason),
            Err(err) => {
                log::error!("fatal frame error at {:?}: {}", err.step(), err);
                self.fatal_error = Some(err.into());
                event_loop.exit();
            }
        }
    }
}
// destroy
impl WinitApp {
    fn destroy(mut self) -> anyhow::Result<()> {
        if let Some(scheduler) = self.scheduler.take() {
            log::info!("frame stats: {:?}", scheduler.stats());
            let backend = scheduler.destroy()?;
            backend.destroy();
        }
        self.window = None;
        Ok(())
    }
}
// 各种 winit 的事件处理
impl ApplicationHandler<UserEvent> for WinitApp {
    // 建议在这里创建 window 和 Renderer
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        log::info!("winit event: resumed");
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.init_after_window(event_loop) {
            log::error!("failed to initialize: {:#}", err);
            self.fatal_error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.on_resized(size);
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        log::warn!("winit event: suspended");
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("loop exiting");
    }
}
