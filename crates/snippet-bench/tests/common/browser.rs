//! Browser helpers for Chromium-backed tests

#![allow(dead_code)]

use anyhow::Result;
use chromiumoxide::browser::BrowserConfig;
use snippet_bench::ChromiumHost;
use std::time::Duration;

/// Check if browser tests should be skipped (when Chrome isn't available)
pub fn should_skip() -> bool {
    std::env::var("SKIP_BROWSER_TESTS").is_ok()
}

/// Macro to skip test if Chrome isn't available
#[macro_export]
macro_rules! skip_if_no_chrome {
    () => {
        if browser::should_skip() {
            eprintln!("Skipping test: SKIP_BROWSER_TESTS is set");
            return;
        }
    };
}

/// Find Chrome for Testing installed by Puppeteer
pub fn find_chrome_for_testing() -> Option<std::path::PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let cache = std::path::Path::new(&home).join(".cache/puppeteer/chrome");

    let mut versions: Vec<_> = std::fs::read_dir(&cache)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    versions.sort_by(|a, b| b.cmp(a));

    let candidates = [
        "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
        "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
        "chrome-linux64/chrome",
    ];
    versions
        .iter()
        .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
        .find(|path| path.exists())
}

/// Launch a headless browser with its own profile directory
pub async fn create_test_host(warm_quantum: Duration) -> Result<ChromiumHost> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static BROWSER_ID: AtomicU64 = AtomicU64::new(0);

    let mut builder = BrowserConfig::builder();
    if let Some(chrome_path) = find_chrome_for_testing() {
        eprintln!("Using Chrome for Testing: {}", chrome_path.display());
        builder = builder.chrome_executable(chrome_path);
    }

    // Unique per process and per call so parallel test binaries don't collide
    let user_data_dir = std::env::temp_dir().join(format!(
        "snippet-bench-{}-{}",
        std::process::id(),
        BROWSER_ID.fetch_add(1, Ordering::SeqCst)
    ));
    if user_data_dir.exists() {
        let _ = std::fs::remove_dir_all(&user_data_dir);
    }
    builder = builder.user_data_dir(user_data_dir);

    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

    Ok(ChromiumHost::launch(config, warm_quantum).await?)
}

/// Try to launch a host, skip test if Chrome not found
pub async fn require_host() -> Option<ChromiumHost> {
    match create_test_host(Duration::from_millis(1)).await {
        Ok(host) => Some(host),
        Err(e) => {
            let message = e.to_string();
            if message.contains("Could not auto detect") || message.contains("failed to launch") {
                eprintln!("Skipping: Chrome not available ({})", message);
                None
            } else {
                panic!("Unexpected browser error: {}", message);
            }
        }
    }
}
