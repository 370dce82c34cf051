//! Build script for traylink
//!
//! On macOS, this compiles the Cocoa status bar shim and links AppKit.

fn main() {
    #[cfg(target_os = "macos")]
    {
        cc::Build::new()
            .file("src/ui/systray_darwin.m")
            .flag("-fobjc-arc")
            .include("src/ui")
            .compile("systray");

        println!("cargo:rustc-link-lib=framework=Cocoa");
    }

    println!("cargo:rerun-if-changed=src/ui/systray.h");
    println!("cargo:rerun-if-changed=src/ui/systray_darwin.m");
}
