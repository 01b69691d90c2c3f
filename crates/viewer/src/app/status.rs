use std::sync::Arc;

use winit::window::Window;

use warpfield::StatusSurface;

/// Native fallback readout: first line in the title bar, every line logged.
pub struct TitleStatus {
    window: Arc<Window>,
    prefix: &'static str,
}

impl TitleStatus {
    pub fn new(window: Arc<Window>, prefix: &'static str) -> Self {
        Self { window, prefix }
    }
}

impl StatusSurface for TitleStatus {
    fn show_status(&mut self, lines: &[String]) {
        if let Some(first) = lines.first() {
            self.window.set_title(&format!("{} - {}", self.prefix, first));
        }
        for line in lines {
            log::warn!("[{}] {}", self.prefix, line);
        }
    }
}
