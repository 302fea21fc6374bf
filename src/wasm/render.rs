//! Render backends.
//!
//! Both backends draw the same population; which one is in use is purely a
//! configuration choice made at construction (or swapped by `update`), so
//! the frame loop never branches on render mode.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlCanvasElement, HtmlElement};

use crate::config::RenderMode;
use crate::sim::Simulation;

/// Shadow blur relative to particle size, the glow look.
const GLOW_SCALE: f32 = 2.5;

pub trait Renderer {
    /// Keeps the backend's surface in sync with the host dimensions.
    fn resize(&mut self, width: f32, height: f32);
    /// Draws the current population. Called once per frame, after `step`.
    fn draw(&mut self, sim: &Simulation);
    /// Detaches everything this backend put into the host. After teardown
    /// the renderer must not be used again.
    fn teardown(&mut self);
}

/// Builds the backend selected by the config. `Err` means the surface could
/// not be acquired; the caller degrades to a no-op engine.
pub fn create(
    document: &Document,
    host: &HtmlElement,
    sim: &Simulation,
) -> Result<Box<dyn Renderer>, JsValue> {
    match sim.config().render_mode {
        RenderMode::Canvas => Ok(Box::new(CanvasRenderer::new(
            document,
            host,
            sim.width(),
            sim.height(),
        )?)),
        RenderMode::Dom => Ok(Box::new(DomRenderer::new(document, host)?)),
    }
}

/// Single shared canvas; particles are glowing filled discs.
pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    ctx: web_sys::CanvasRenderingContext2d,
}

impl CanvasRenderer {
    pub fn new(
        document: &Document,
        host: &HtmlElement,
        width: f32,
        height: f32,
    ) -> Result<Self, JsValue> {
        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        canvas.set_width(width as u32);
        canvas.set_height(height as u32);
        // decorative layer: never intercept input meant for the host
        let style = canvas.style();
        style.set_property("position", "absolute")?;
        style.set_property("inset", "0")?;
        style.set_property("pointer-events", "none")?;
        host.append_child(&canvas)?;

        let ctx = match canvas.get_context("2d")? {
            Some(ctx) => ctx.dyn_into::<web_sys::CanvasRenderingContext2d>()?,
            None => {
                canvas.remove();
                return Err(JsValue::from_str("2d canvas context unavailable"));
            }
        };

        Ok(Self { canvas, ctx })
    }
}

impl Renderer for CanvasRenderer {
    fn resize(&mut self, width: f32, height: f32) {
        self.canvas.set_width(width as u32);
        self.canvas.set_height(height as u32);
    }

    fn draw(&mut self, sim: &Simulation) {
        let ctx = &self.ctx;
        ctx.clear_rect(0.0, 0.0, sim.width() as f64, sim.height() as f64);
        // additive by default so overlapping particles brighten; an invalid
        // configured operation is ignored by the canvas, not an error
        let _ = ctx.set_global_composite_operation(&sim.config().blend_mode);

        let colors = &sim.config().colors;
        for (_, p) in sim.particles() {
            let color = &colors[p.color % colors.len()];
            ctx.set_global_alpha(p.opacity as f64);
            ctx.set_shadow_blur((p.size * GLOW_SCALE) as f64);
            ctx.set_shadow_color(color);
            ctx.set_fill_style_str(color);
            ctx.begin_path();
            let _ = ctx.arc(
                p.pos.x as f64,
                p.pos.y as f64,
                p.size as f64,
                0.0,
                std::f64::consts::TAU,
            );
            ctx.fill();
        }

        ctx.set_global_alpha(1.0);
        ctx.set_shadow_blur(0.0);
        let _ = ctx.set_global_composite_operation("source-over");
    }

    fn teardown(&mut self) {
        self.canvas.remove();
    }
}

/// One absolutely-positioned element per occupied arena slot. Nodes are
/// keyed by slot index and released the frame their particle disappears.
pub struct DomRenderer {
    document: Document,
    container: HtmlElement,
    nodes: Vec<Option<HtmlElement>>,
    // per-frame occupancy scratch, kept to avoid reallocating
    occupied: Vec<bool>,
}

impl DomRenderer {
    pub fn new(document: &Document, host: &HtmlElement) -> Result<Self, JsValue> {
        let container: HtmlElement = document.create_element("div")?.dyn_into()?;
        let style = container.style();
        style.set_property("position", "absolute")?;
        style.set_property("inset", "0")?;
        style.set_property("overflow", "hidden")?;
        style.set_property("pointer-events", "none")?;
        host.append_child(&container)?;

        Ok(Self {
            document: document.clone(),
            container,
            nodes: Vec::new(),
            occupied: Vec::new(),
        })
    }

    fn node_for(&mut self, slot: usize) -> Result<HtmlElement, JsValue> {
        if let Some(node) = self.nodes[slot].clone() {
            return Ok(node);
        }
        let node: HtmlElement = self.document.create_element("div")?.dyn_into()?;
        let style = node.style();
        style.set_property("position", "absolute")?;
        style.set_property("border-radius", "50%")?;
        style.set_property("top", "0")?;
        style.set_property("left", "0")?;
        self.container.append_child(&node)?;
        self.nodes[slot] = Some(node.clone());
        Ok(node)
    }
}

impl Renderer for DomRenderer {
    fn resize(&mut self, _width: f32, _height: f32) {
        // nodes are positioned in host coordinates; nothing to do
    }

    fn draw(&mut self, sim: &Simulation) {
        // the node table only grows; a shrinking slot bound (population
        // cleared) still has its stale nodes swept below
        let bound = sim.slot_bound();
        if self.nodes.len() < bound {
            self.nodes.resize(bound, None);
        }
        self.occupied.clear();
        self.occupied.resize(self.nodes.len(), false);

        let colors = &sim.config().colors;
        for (slot, p) in sim.particles() {
            self.occupied[slot] = true;
            let Ok(node) = self.node_for(slot) else {
                continue;
            };
            let color = &colors[p.color % colors.len()];
            let diameter = p.size * 2.0;
            let style = node.style();
            let _ = style.set_property("width", &format!("{diameter}px"));
            let _ = style.set_property("height", &format!("{diameter}px"));
            let _ = style.set_property("background", color);
            let _ = style.set_property("opacity", &p.opacity.to_string());
            let _ = style.set_property(
                "box-shadow",
                &format!("0 0 {}px {}", p.size * GLOW_SCALE, color),
            );
            let _ = style.set_property(
                "transform",
                &format!("translate({}px, {}px)", p.pos.x - p.size, p.pos.y - p.size),
            );
        }

        // release nodes whose slot went vacant this frame
        for slot in 0..self.nodes.len() {
            if !self.occupied[slot] {
                if let Some(node) = self.nodes[slot].take() {
                    node.remove();
                }
            }
        }
    }

    fn teardown(&mut self) {
        for node in self.nodes.iter_mut() {
            if let Some(node) = node.take() {
                node.remove();
            }
        }
        self.container.remove();
    }
}
