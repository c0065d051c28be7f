use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=kernel.ld");

    // Only drive the linker script for the bare-metal target; host builds
    // (unit tests) link normally.
    let target = env::var("TARGET").unwrap_or_default();
    if target.starts_with("arm") && target.contains("none") {
        let script = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap()).join("kernel.ld");
        println!("cargo:rustc-link-arg-bins=-T{}", script.display());
    }
}
