// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

fn main() {
    println!(r#"cargo:rustc-check-cfg=cfg(sigcore_cortex_m)"#);
    println!(r#"cargo:rustc-check-cfg=cfg(sigcore_armv6m)"#);
    println!("cargo:rerun-if-changed=build.rs");

    let target = std::env::var("TARGET").unwrap_or_default();
    match target.as_str() {
        "thumbv7m-none-eabi"
        | "thumbv7em-none-eabi"
        | "thumbv7em-none-eabihf"
        | "thumbv8m.base-none-eabi"
        | "thumbv8m.main-none-eabi"
        | "thumbv8m.main-none-eabihf" => {
            // Hook the vector table and SysTick.
            println!("cargo:rustc-cfg=sigcore_cortex_m");
        }
        "thumbv6m-none-eabi" => {
            println!("cargo:rustc-cfg=sigcore_cortex_m");
            // The v6-M NVIC tops out at 32 external interrupts, so the signal
            // table can be a lot smaller.
            println!("cargo:rustc-cfg=sigcore_armv6m");
        }
        t if t.starts_with("thumb") => {
            panic!("unknown Cortex-M target {}, update build.rs", t);
        }
        _ => {
            // Hosted build (unit tests, docs). No hardware entry points; the
            // table is still there so software raises work.
        }
    }
}
