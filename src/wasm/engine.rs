//! The JS-facing engine.
//!
//! One `ParticleEngine` owns one surface inside one host element. The
//! contract is deliberately forgiving: construction never throws for
//! decorative-failure reasons. If anything about the environment is broken
//! the engine logs a warning and quietly does nothing.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlElement};

use crate::config::{ConfigPatch, REFERENCE_FRAME_MS};
use crate::sim::Simulation;

use super::render::{self, Renderer};

/// Delta clamp, ms. A tab coming back from the background reports a huge
/// frame gap; integrating it would teleport every particle.
const MAX_FRAME_DELTA_MS: f64 = 100.0;

struct EngineState {
    sim: Simulation,
    renderer: Option<Box<dyn Renderer>>,
    host: HtmlElement,
    raf_id: Option<i32>,
    last_ts: Option<f64>,
    destroyed: bool,
}

/// Ambient particle background bound to a host element.
///
/// Lifecycle: uninitialized → running → destroyed. `destroy` is terminal and
/// idempotent; a destroyed engine is inert and a new effect needs a fresh
/// instance.
#[wasm_bindgen]
pub struct ParticleEngine {
    state: Rc<RefCell<EngineState>>,
    frame: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
    on_resize: Option<Closure<dyn FnMut()>>,
    on_pointer_move: Option<Closure<dyn FnMut(web_sys::PointerEvent)>>,
    on_pointer_leave: Option<Closure<dyn FnMut(web_sys::PointerEvent)>>,
    on_click: Option<Closure<dyn FnMut(web_sys::MouseEvent)>>,
}

#[wasm_bindgen]
impl ParticleEngine {
    /// Mounts a rendering surface into `host`, fills the population and
    /// starts the animation loop. `config` is a plain JS object (or
    /// undefined for the ambient defaults); unrecognized fields are ignored
    /// and malformed ones fall back to defaults with a console warning.
    #[wasm_bindgen(constructor)]
    pub fn new(host: HtmlElement, config: JsValue) -> ParticleEngine {
        let patch = parse_patch(config).unwrap_or_default();
        let rect = host.get_bounding_client_rect();
        let sim = Simulation::new(
            patch.into_config(),
            rect.width() as f32,
            rect.height() as f32,
            seed_from_clock(),
        );

        let renderer = match window().and_then(|w| w.document()) {
            Some(document) => match render::create(&document, &host, &sim) {
                Ok(renderer) => Some(renderer),
                Err(err) => {
                    warn("aura: rendering surface unavailable, effect disabled", Some(&err));
                    None
                }
            },
            None => {
                warn("aura: no document, effect disabled", None);
                None
            }
        };

        let runnable = renderer.is_some();
        let state = Rc::new(RefCell::new(EngineState {
            sim,
            renderer,
            host,
            raf_id: None,
            last_ts: None,
            destroyed: false,
        }));

        let mut engine = ParticleEngine {
            state,
            frame: Rc::new(RefCell::new(None)),
            on_resize: None,
            on_pointer_move: None,
            on_pointer_leave: None,
            on_click: None,
        };
        if runnable {
            engine.attach_listeners();
            engine.start_loop();
        }
        engine
    }

    /// Merges a partial config into the live one. A `count` change converges
    /// incrementally; a `renderMode` change swaps the backend in place;
    /// everything else takes effect on the next frame.
    pub fn update(&mut self, config: JsValue) {
        let Some(patch) = parse_patch(config) else {
            return;
        };
        let mut st = self.state.borrow_mut();
        if st.destroyed {
            return;
        }

        let old_mode = st.sim.config().render_mode;
        st.sim.apply_patch(&patch);

        if st.sim.config().render_mode != old_mode {
            if let Some(mut renderer) = st.renderer.take() {
                renderer.teardown();
            }
            if let Some(document) = window().and_then(|w| w.document()) {
                match render::create(&document, &st.host, &st.sim) {
                    Ok(renderer) => st.renderer = Some(renderer),
                    Err(err) => {
                        warn("aura: render mode switch failed, effect disabled", Some(&err));
                    }
                }
            }
        }
    }

    /// Stops the loop, detaches listeners and removes every node the engine
    /// put into the host. Safe to call any number of times.
    pub fn destroy(&mut self) {
        {
            let mut st = self.state.borrow_mut();
            if st.destroyed {
                return;
            }
            st.destroyed = true;

            if let Some(id) = st.raf_id.take() {
                if let Some(w) = window() {
                    let _ = w.cancel_animation_frame(id);
                }
            }
            if let Some(mut renderer) = st.renderer.take() {
                renderer.teardown();
            }
            st.sim.clear();
        }

        self.detach_listeners();
        *self.frame.borrow_mut() = None;
    }

    /// Live particle count, bursts included.
    pub fn count(&self) -> usize {
        self.state.borrow().sim.len()
    }

    /// Whether an animation frame is currently scheduled.
    pub fn is_running(&self) -> bool {
        self.state.borrow().raf_id.is_some()
    }
}

impl ParticleEngine {
    fn start_loop(&mut self) {
        let state = Rc::clone(&self.state);
        let frame = Rc::clone(&self.frame);

        *self.frame.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
            let mut st = state.borrow_mut();
            st.raf_id = None;
            if st.destroyed {
                return;
            }
            // host was removed from the document: halt without rescheduling
            if !st.host.is_connected() {
                return;
            }

            let dt = match st.last_ts {
                Some(prev) => (ts - prev).clamp(0.0, MAX_FRAME_DELTA_MS),
                None => REFERENCE_FRAME_MS as f64,
            };
            st.last_ts = Some(ts);

            st.sim.step(dt as f32);
            let EngineState { sim, renderer, .. } = &mut *st;
            if let Some(renderer) = renderer.as_mut() {
                renderer.draw(sim);
            }

            if let Some(w) = window() {
                if let Some(cb) = frame.borrow().as_ref() {
                    if let Ok(id) = w.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        st.raf_id = Some(id);
                    }
                }
            }
        }) as Box<dyn FnMut(f64)>));

        let Some(w) = window() else { return };
        if let Some(cb) = self.frame.borrow().as_ref() {
            if let Ok(id) = w.request_animation_frame(cb.as_ref().unchecked_ref()) {
                self.state.borrow_mut().raf_id = Some(id);
            }
        }
    }

    fn attach_listeners(&mut self) {
        let Some(w) = window() else { return };
        let host = self.state.borrow().host.clone();

        let on_resize = {
            let state = Rc::clone(&self.state);
            Closure::wrap(Box::new(move || {
                let mut st = state.borrow_mut();
                if st.destroyed || !st.host.is_connected() {
                    return;
                }
                let rect = st.host.get_bounding_client_rect();
                let (width, height) = (rect.width() as f32, rect.height() as f32);
                st.sim.resize(width, height);
                if let Some(renderer) = st.renderer.as_mut() {
                    renderer.resize(width, height);
                }
            }) as Box<dyn FnMut()>)
        };
        let _ = w.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref());
        self.on_resize = Some(on_resize);

        let on_pointer_move = {
            let state = Rc::clone(&self.state);
            Closure::wrap(Box::new(move |event: web_sys::PointerEvent| {
                let mut st = state.borrow_mut();
                if st.destroyed {
                    return;
                }
                let rect = st.host.get_bounding_client_rect();
                let local = Vec2::new(
                    (event.client_x() as f64 - rect.left()) as f32,
                    (event.client_y() as f64 - rect.top()) as f32,
                );
                // only records state; the force is sampled once per frame
                st.sim.set_pointer(Some(local));
            }) as Box<dyn FnMut(web_sys::PointerEvent)>)
        };
        let _ = host.add_event_listener_with_callback(
            "pointermove",
            on_pointer_move.as_ref().unchecked_ref(),
        );
        self.on_pointer_move = Some(on_pointer_move);

        let on_pointer_leave = {
            let state = Rc::clone(&self.state);
            Closure::wrap(Box::new(move |_: web_sys::PointerEvent| {
                state.borrow_mut().sim.set_pointer(None);
            }) as Box<dyn FnMut(web_sys::PointerEvent)>)
        };
        let _ = host.add_event_listener_with_callback(
            "pointerleave",
            on_pointer_leave.as_ref().unchecked_ref(),
        );
        self.on_pointer_leave = Some(on_pointer_leave);

        let on_click = {
            let state = Rc::clone(&self.state);
            Closure::wrap(Box::new(move |event: web_sys::MouseEvent| {
                let mut st = state.borrow_mut();
                if st.destroyed || !st.sim.config().enable_interaction {
                    return;
                }
                let rect = st.host.get_bounding_client_rect();
                let at = Vec2::new(
                    (event.client_x() as f64 - rect.left()) as f32,
                    (event.client_y() as f64 - rect.top()) as f32,
                );
                st.sim.burst(at);
            }) as Box<dyn FnMut(web_sys::MouseEvent)>)
        };
        let _ = host.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());
        self.on_click = Some(on_click);
    }

    fn detach_listeners(&mut self) {
        let host = self.state.borrow().host.clone();
        if let Some(w) = window() {
            if let Some(cb) = self.on_resize.take() {
                let _ =
                    w.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
            }
        }
        if let Some(cb) = self.on_pointer_move.take() {
            let _ = host
                .remove_event_listener_with_callback("pointermove", cb.as_ref().unchecked_ref());
        }
        if let Some(cb) = self.on_pointer_leave.take() {
            let _ = host
                .remove_event_listener_with_callback("pointerleave", cb.as_ref().unchecked_ref());
        }
        if let Some(cb) = self.on_click.take() {
            let _ = host.remove_event_listener_with_callback("click", cb.as_ref().unchecked_ref());
        }
    }
}

/// Parses a JS config object. `undefined`/`null` mean "defaults"; a
/// malformed object is reported and treated the same way.
fn parse_patch(config: JsValue) -> Option<ConfigPatch> {
    if config.is_undefined() || config.is_null() {
        return Some(ConfigPatch::default());
    }
    match serde_wasm_bindgen::from_value(config) {
        Ok(patch) => Some(patch),
        Err(err) => {
            warn("aura: malformed config ignored", Some(&err.into()));
            None
        }
    }
}

fn seed_from_clock() -> u64 {
    let now = window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now);
    (now * 1000.0) as u64
}

fn warn(message: &str, err: Option<&JsValue>) {
    match err {
        Some(err) => web_sys::console::warn_2(&JsValue::from_str(message), err),
        None => web_sys::console::warn_1(&JsValue::from_str(message)),
    }
}
