//! Fallback readout on a canvas whose GL context is already taken.
//! Run with `wasm-pack test --headless --firefox crates/viewer -- --features web`.
#![cfg(all(target_arch = "wasm32", feature = "web"))]

use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement};

use warp_viewer::web::canvas::CanvasStatus;
use warpfield::StatusSurface;

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

fn mounted_canvas(id: &str) -> HtmlCanvasElement {
    let canvas: HtmlCanvasElement = document().create_element("canvas").unwrap().unchecked_into();
    canvas.set_id(id);
    canvas.set_class_name("warp");
    canvas.set_width(320);
    canvas.set_height(200);
    document().body().unwrap().append_child(&canvas).unwrap();
    canvas
}

#[wasm_bindgen_test]
fn readout_replaces_gl_bound_canvas() {
    let canvas = mounted_canvas("warp-readout");
    assert!(canvas.get_context("webgl").unwrap().is_some());

    let mut status = CanvasStatus::new(canvas.clone());
    status.show_status(&["warp field: fallback".to_string()]);

    let shown: HtmlCanvasElement = document()
        .get_element_by_id("warp-readout")
        .unwrap()
        .dyn_into()
        .unwrap();
    assert!(!shown.is_same_node(Some(&canvas)));
    assert!(shown.is_same_node(Some(status.canvas())));
    assert_eq!((shown.width(), shown.height()), (320, 200));
    assert_eq!(shown.class_name(), "warp");

    let ctx: CanvasRenderingContext2d = shown.get_context("2d").unwrap().unwrap().unchecked_into();
    let pixel = ctx.get_image_data(0.0, 0.0, 1.0, 1.0).unwrap().data();
    assert_eq!(pixel[3], 255, "background painted");
}

#[wasm_bindgen_test]
fn readout_keeps_plain_canvas() {
    let canvas = mounted_canvas("warp-plain");
    let mut status = CanvasStatus::new(canvas.clone());
    status.show_status(&["warp field: fallback".to_string()]);
    assert!(status.canvas().is_same_node(Some(&canvas)));
}
