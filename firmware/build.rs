use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn Error>> {
    // The linker script for the STM32F030 is found via OUT_DIR.
    let out = PathBuf::from(env::var_os("OUT_DIR").ok_or("OUT_DIR not set")?);
    fs::write(out.join("memory.x"), include_bytes!("memory.x"))?;
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rustc-link-arg=-Tlink.x");

    // `rev2` is on by default, so asking for `rev1` usually enables both.
    if env::var_os("CARGO_FEATURE_REV1").is_some() && env::var_os("CARGO_FEATURE_REV2").is_some() {
        println!("cargo:warning=both rev1 and rev2 enabled, building for rev1");
    }

    Ok(())
}
