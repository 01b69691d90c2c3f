use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::{closure::Closure, JsCast, JsValue};

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// `requestAnimationFrame` chain that calls `tick` with seconds since the
/// first frame. Runs until [`FrameLoop::cancel`] or drop.
pub struct FrameLoop {
    callback: FrameCallback,
    pending: Rc<Cell<Option<i32>>>,
}

impl FrameLoop {
    pub fn start<F>(mut tick: F) -> Result<Self, JsValue>
    where
        F: FnMut(f64) + 'static,
    {
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let pending = Rc::new(Cell::new(None));

        let next = Rc::clone(&callback);
        let id_slot = Rc::clone(&pending);
        let mut origin: Option<f64> = None;
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |now_ms: f64| {
            if id_slot.take().is_none() {
                return;
            }
            let origin_ms = *origin.get_or_insert(now_ms);
            tick((now_ms - origin_ms) / 1000.0);

            match request_frame(&next) {
                Ok(id) => id_slot.set(Some(id)),
                Err(e) => log::error!("requestAnimationFrame failed: {:?}", e),
            }
        }) as Box<dyn FnMut(f64)>));

        pending.set(Some(request_frame(&callback)?));
        Ok(Self { callback, pending })
    }

    pub fn is_running(&self) -> bool {
        self.pending.get().is_some()
    }

    /// Stop scheduling frames and release the callback.
    pub fn cancel(&mut self) {
        if let Some(id) = self.pending.take() {
            if let Some(window) = web_sys::window() {
                let _ = window.cancel_animation_frame(id);
            }
        }
        self.callback.borrow_mut().take();
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn request_frame(callback: &FrameCallback) -> Result<i32, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let slot = callback.borrow();
    let closure = slot
        .as_ref()
        .ok_or_else(|| JsValue::from_str("frame loop cancelled"))?;
    window.request_animation_frame(closure.as_ref().unchecked_ref())
}
