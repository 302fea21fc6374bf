//! Ambient particle backgrounds for the browser.
//!
//! The simulation core (`config`, `particle`, `arena`, `sim`) is plain Rust
//! with no DOM dependency and is exercised by native unit tests. The
//! `wasm` module binds it to a host element: it mounts a canvas (or a pool
//! of per-particle nodes), drives the `requestAnimationFrame` loop and
//! translates pointer/resize events into simulation inputs.
//!
//! The engine is decorative by contract: it never propagates an error into
//! the page. If the environment is broken it logs a warning and goes inert.

pub mod arena;
pub mod config;
pub mod particle;
pub mod sim;

mod rng;

// Browser bindings only exist on the wasm target; `cargo test` on the host
// builds and tests the simulation core alone.
#[cfg(target_arch = "wasm32")]
mod wasm {
    mod engine;
    mod render;

    pub use engine::ParticleEngine;

    use wasm_bindgen::prelude::wasm_bindgen;

    #[wasm_bindgen(start)]
    pub fn start() {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::ParticleEngine;
