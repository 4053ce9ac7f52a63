fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=ORT_LIB_LOCATION");

    // Only the ONNX encoder links against onnxruntime
    if std::env::var_os("CARGO_FEATURE_ONNX").is_none() {
        return;
    }

    // Point the linker at a custom ONNX Runtime SDK when one is given
    if let Ok(sdk_path) = std::env::var("ORT_LIB_LOCATION") {
        let lib_path = format!("{}/lib", sdk_path);
        println!("cargo:warning=Using ONNX Runtime SDK from: {}", sdk_path);
        println!("cargo:rustc-link-search=native={}", lib_path);
    }
}
