use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use warpfield::{
    Destroy, DualEngine, EngineConfig, FeatureFlags, RenderError, UniformBus, WarpEngine,
    WarpParams, UNIFORMS_TOPIC,
};

use super::status::TitleStatus;
use crate::gpu::WgpuBackend;

/// What the binary resolved from its arguments.
pub struct ViewerOptions {
    pub config: EngineConfig,
    pub flags: FeatureFlags,
}

/// Which of the two windows an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pane {
    Real,
    Show,
}

impl Pane {
    fn title(self) -> &'static str {
        match self {
            Pane::Real => "Warp field (REAL)",
            Pane::Show => "Warp field (SHOW)",
        }
    }
}

/// Open the REAL and SHOW windows and run until either closes.
pub fn run(options: ViewerOptions, feed: Receiver<WarpParams>) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut viewer = Viewer::new(options, feed);
    event_loop.run_app(&mut viewer)?;
    Ok(())
}

struct Viewer {
    options: ViewerOptions,
    feed: Receiver<WarpParams>,
    bus: UniformBus,
    windows: Vec<(Pane, Arc<Window>)>,
    dual: Option<DualEngine<WgpuBackend>>,
    start: Instant,
}

impl Viewer {
    fn new(options: ViewerOptions, feed: Receiver<WarpParams>) -> Self {
        Self {
            options,
            feed,
            bus: UniformBus::new(),
            windows: Vec::new(),
            dual: None,
            start: Instant::now(),
        }
    }

    fn pane(&self, id: WindowId) -> Option<Pane> {
        self.windows
            .iter()
            .find(|(_, w)| w.id() == id)
            .map(|(pane, _)| *pane)
    }

    fn open_pane(
        &mut self,
        event_loop: &ActiveEventLoop,
        pane: Pane,
        config: &EngineConfig,
    ) -> Result<WarpEngine<WgpuBackend>, RenderError> {
        let window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title(pane.title())
                    .with_inner_size(winit::dpi::LogicalSize::new(960, 640)),
            )
            .map_err(|e| RenderError::ContextUnavailable(e.to_string()))?;
        let window = Arc::new(window);
        self.windows.push((pane, Arc::clone(&window)));

        let backend = pollster::block_on(WgpuBackend::new(Arc::clone(&window)));
        let status = Box::new(TitleStatus::new(window, pane.title()));
        WarpEngine::new(backend, status, config)
    }

    fn start_engines(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RenderError> {
        let mut config = self.options.config.clone();
        config.render_enabled = self.options.flags.render_enabled(config.render_enabled);

        let real = self.open_pane(event_loop, Pane::Real, &config)?;
        let show = self.open_pane(event_loop, Pane::Show, &config)?;
        self.dual = Some(DualEngine::new(real, show, config.show, &mut self.bus));
        log::info!(
            "viewer started (rendering {})",
            if config.render_enabled { "on" } else { "off" }
        );
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut dual) = self.dual.take() {
            dual.destroy();
        }
        event_loop.exit();
    }

    fn toggle_rendering(&mut self) {
        if let Some(dual) = self.dual.as_mut() {
            let enabled = !dual.real().render_enabled();
            dual.set_render_enabled(enabled);
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.dual.is_some() {
            return;
        }
        if let Err(e) = self.start_engines(event_loop) {
            log::error!("viewer failed to start: {}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(pane) = self.pane(window_id) else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(size) => {
                if let Some(dual) = self.dual.as_mut() {
                    let engine = match pane {
                        Pane::Real => dual.real_mut(),
                        Pane::Show => dual.show_mut(),
                    };
                    if let Some(backend) = engine.backend_mut() {
                        backend.resize(size.width, size.height);
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event,
                is_synthetic: false,
                ..
            } if event.state == ElementState::Pressed => match event.logical_key.as_ref() {
                Key::Named(NamedKey::Escape) => self.shutdown(event_loop),
                Key::Character("c") | Key::Character("C") => self.toggle_rendering(),
                _ => {}
            },
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        let Some(dual) = self.dual.as_mut() else {
            return;
        };

        while let Ok(patch) = self.feed.try_recv() {
            self.bus.publish(UNIFORMS_TOPIC, &patch);
        }
        let forwarded = dual.pump();
        if forwarded > 0 {
            log::debug!("forwarded {} feed patches", forwarded);
        }

        dual.draw(self.start.elapsed().as_secs_f64());

        for (_, window) in &self.windows {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pane_titles_differ() {
        assert_ne!(Pane::Real.title(), Pane::Show.title());
        assert!(Pane::Show.title().contains("SHOW"));
    }
}
