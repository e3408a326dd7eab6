//! Generate `netreq.h` from the `extern "C"` surface into `OUT_DIR`.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        return;
    };
    let header = PathBuf::from(out_dir).join("netreq.h");

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("NETREQ_H".to_string()),
        cpp_compat: true,
        ..Default::default()
    };

    // A header failure must not break the library build.
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(&header);
            println!("cargo:rustc-env=NETREQ_HEADER={}", header.display());
        }
        Err(e) => println!("cargo:warning=cbindgen skipped: {e}"),
    }
}
