//! JavaScript surface of the web host.
//!
//! ```js
//! const warp = new WarpRegistry();
//! warp.attach("warp-real", false);
//! warp.attach("warp-show", true);
//! warp.publish(JSON.stringify({ dutyCycle: 0.14, g_y: 26 }));
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use warpfield::{
    Destroy, EngineConfig, EngineRegistry, FeatureFlags, LockParity, LockedEngine, Parity,
    RenderError, UniformSink, WarpEngine, WarpParams,
};

use super::backend::WebGlBackend;
use super::canvas::{fit_to_display, CanvasStatus};
use super::console;
use super::frame_loop::FrameLoop;

type SharedEngine = Rc<RefCell<LockedEngine<WarpEngine<WebGlBackend>>>>;

/// One canvas: its gated engine and the frame loop drawing it.
struct CanvasEngine {
    engine: SharedEngine,
    frame: Option<FrameLoop>,
}

impl CanvasEngine {
    fn engine(&self) -> std::cell::RefMut<'_, LockedEngine<WarpEngine<WebGlBackend>>> {
        self.engine.borrow_mut()
    }

    fn is_show(&self) -> bool {
        !self.engine.borrow().parity().is_parity()
    }
}

impl Destroy for CanvasEngine {
    fn destroy(&mut self) {
        if let Some(mut frame) = self.frame.take() {
            frame.cancel();
        }
        self.engine.borrow_mut().destroy();
    }
}

#[wasm_bindgen]
pub struct WarpRegistry {
    engines: EngineRegistry<CanvasEngine>,
    config: EngineConfig,
    flags: FeatureFlags,
}

#[wasm_bindgen]
impl WarpRegistry {
    /// `config_json` is an optional serialized engine config. Feature flags
    /// come from the page's query string.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WarpRegistry, JsValue> {
        console::init(log::LevelFilter::Info);
        let config = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(to_js)?,
            None => EngineConfig::default(),
        };
        let query = web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default();
        Ok(WarpRegistry {
            engines: EngineRegistry::new(),
            config,
            flags: FeatureFlags::from_query(&query),
        })
    }

    /// Bind an engine to the canvas with id `canvas_id`, reusing one that is
    /// already there. `show` selects the display-boosted engine.
    pub fn attach(&mut self, canvas_id: &str, show: bool) -> Result<(), JsValue> {
        let (config, flags) = (&self.config, self.flags);
        self.engines
            .attach(canvas_id, || build(canvas_id, show, config, flags))
            .map(|_| ())
            .map_err(to_js)
    }

    /// Destroy whatever is bound to the canvas, then bind a fresh engine.
    pub fn replace(&mut self, canvas_id: &str, show: bool) -> Result<(), JsValue> {
        let (config, flags) = (&self.config, self.flags);
        self.engines
            .replace(canvas_id, || build(canvas_id, show, config, flags))
            .map(|_| ())
            .map_err(to_js)
    }

    pub fn detach(&mut self, canvas_id: &str) -> bool {
        self.engines.detach(canvas_id)
    }

    /// Merge a JSON patch into one engine. Nothing is drawn until the next
    /// frame.
    #[wasm_bindgen(js_name = updateUniforms)]
    pub fn update_uniforms(&mut self, canvas_id: &str, patch_json: &str) -> Result<(), JsValue> {
        let patch = WarpParams::from_json(patch_json).map_err(to_js)?;
        let entry = self
            .engines
            .get_mut(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no engine on '{}'", canvas_id)))?;
        entry.engine().update_uniforms(patch);
        Ok(())
    }

    /// Broadcast a canonical parameter set to every engine: verbatim to
    /// parity engines, with the display boost to show engines. Returns how
    /// many engines received it.
    pub fn publish(&mut self, canonical_json: &str) -> Result<usize, JsValue> {
        let canonical = WarpParams::from_json(canonical_json).map_err(to_js)?;
        let boost = self.config.show;
        let mut n = 0;
        for (_, entry) in self.engines.iter_mut() {
            let patch = if entry.is_show() {
                boost.apply(&canonical)
            } else {
                canonical.clone()
            };
            entry.engine().update_uniforms(patch);
            n += 1;
        }
        Ok(n)
    }

    #[wasm_bindgen(js_name = setRenderEnabled)]
    pub fn set_render_enabled(&mut self, canvas_id: &str, enabled: bool) -> bool {
        match self.engines.get_mut(canvas_id) {
            Some(entry) => {
                entry.engine().set_render_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Current merged parameters of one engine as JSON.
    pub fn params(&self, canvas_id: &str) -> Option<String> {
        let entry = self.engines.get(canvas_id)?;
        let engine = entry.engine.borrow();
        serde_json::to_string(engine.params()).ok()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    #[wasm_bindgen(js_name = isEmpty)]
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

fn build(canvas_id: &str, show: bool, config: &EngineConfig, flags: FeatureFlags) -> Result<CanvasEngine, RenderError> {
    let canvas = find_canvas(canvas_id)?;
    fit_to_display(&canvas);

    let mut config = config.clone();
    config.render_enabled = flags.render_enabled(config.render_enabled);
    let backend = WebGlBackend::new(canvas.clone());
    let status = Box::new(CanvasStatus::new(canvas.clone()));
    let parity = if show {
        Parity::Show {
            default_gain: config.show.display_gain,
        }
    } else {
        Parity::Real
    };
    let engine: SharedEngine = Rc::new(RefCell::new(
        WarpEngine::new(backend, status, &config)?.lock_parity(parity),
    ));

    let tick_engine = Rc::clone(&engine);
    let frame = FrameLoop::start(move |t| {
        fit_to_display(&canvas);
        match tick_engine.try_borrow_mut() {
            Ok(mut engine) => engine.draw(t),
            Err(_) => log::debug!("engine busy; skipping frame"),
        }
    })
    .map_err(|e| RenderError::Config(format!("requestAnimationFrame: {:?}", e)))?;

    log::info!("engine attached to '{}' ({:?})", canvas_id, parity);
    Ok(CanvasEngine {
        engine,
        frame: Some(frame),
    })
}

fn find_canvas(id: &str) -> Result<HtmlCanvasElement, RenderError> {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(id))
        .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        .ok_or_else(|| RenderError::Config(format!("no canvas with id '{}'", id)))
}

fn to_js<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}
