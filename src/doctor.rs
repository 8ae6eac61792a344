//! Environment readiness check.

use crate::portal::chromium::find_chromium;
use anyhow::Result;

/// Check Chromium and the privileged tools the rotation pipeline needs.
pub fn run() -> Result<()> {
    println!("portalhop doctor");
    println!("================");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    let chromium = find_chromium();
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install google-chrome or chromium, \
             or set PORTALHOP_CHROMIUM_PATH."
        ),
    }

    let mut tools_ok = true;
    for tool in ["macchanger", "ifconfig", "systemctl", "sudo"] {
        match which::which(tool) {
            Ok(path) => println!("[OK] {tool} found: {}", path.display()),
            Err(_) => {
                tools_ok = false;
                println!("[!!] {tool} NOT found on PATH");
            }
        }
    }

    let preload_ok = std::path::Path::new("preload.js").exists();
    if preload_ok {
        println!("[OK] preload.js present in the working directory");
    } else {
        println!("[!!] preload.js missing from the working directory");
    }

    println!();
    if chromium.is_some() && tools_ok && preload_ok {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
