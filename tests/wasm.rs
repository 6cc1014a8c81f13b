#![cfg(target_arch = "wasm32")]

use causal_kernel::CausalKernel;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

#[wasm_bindgen_test]
fn constructs_with_default_config() {
    let kernel = CausalKernel::js_new(JsValue::UNDEFINED);
    assert!(kernel.is_ok());
}

#[wasm_bindgen_test]
fn missing_focus_is_an_error() {
    let mut kernel = CausalKernel::js_new(JsValue::NULL).expect("test: default config");
    assert!(kernel.js_simulate("nobody", 0.5, 0.0).is_err());
    assert_eq!(kernel.js_gate_state("nobody"), "OBSERVE");
}

#[wasm_bindgen_test]
fn rejects_out_of_range_operator_scale() {
    let mut kernel = CausalKernel::js_new(JsValue::UNDEFINED).expect("test: default config");
    assert!(kernel.js_set_operator_scale(11).is_err());
    assert!(kernel.js_set_operator_scale(3).is_ok());
}
