//! Build script for wdb-core
//!
//! Checks the toolchain and target before compilation:
//! - Minimum Rust version (let-else and `[char; N]` patterns need 1.65.0+)
//! - Target OS: only Windows has a native backend; elsewhere the portable
//!   core still builds (for tests) and a warning is printed
//! - Target architecture: x86 and x86_64 have register layouts

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    match rustc_version::version() {
        Ok(rustc_version) => {
            let min_rust_version = rustc_version::Version::new(1, 65, 0);
            if rustc_version < min_rust_version {
                panic!("wdb-core requires Rust {min_rust_version} or newer, found {rustc_version}");
            }
        }
        // Some build environments hide the compiler version; just warn.
        Err(_) => println!("cargo:warning=could not verify Rust version"),
    }

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "windows" {
        println!("cargo:warning=wdb-core: no native debugging backend for target OS '{target_os}'; building the portable core only");
    }

    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if target_os == "windows" && target_arch != "x86" && target_arch != "x86_64" {
        panic!("wdb-core has no register layout for Windows on '{target_arch}'");
    }
}
