use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    // put memory.x where the cortex-m-rt linker script can find it
    let out = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    fs::copy("memory.x", out.join("memory.x")).unwrap();
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");
}
