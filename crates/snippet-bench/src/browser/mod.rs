//! Chromium render host
//!
//! [`ChromiumHost`] drives a single page over the DevTools protocol and
//! implements every collaborator the harness needs: the render target, the
//! page's `performance.now()` clock, `requestAnimationFrame`/`setTimeout`
//! scheduling, an in-page CPU warmer and `performance.mark` tracing.
//!
//! Each operation is one `Runtime.evaluate` round trip. A whole sample window
//! runs as a single script through [`RenderHost::render_timed`], so no round
//! trip lands between two `performance.now()` readings; the remaining fixed
//! cost of the readings themselves is what the baseline subtracts.
//!
//! Without cross-origin isolation Chromium coarsens `performance.now()` to
//! 100µs, so sub-100µs differences are not resolvable through this host.

pub mod script;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetCpuThrottlingRateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::error::{BenchError, Result};
use crate::host::{Clock, RenderHost, Scheduler, TraceSink, Warmer};
use crate::sample::Boundaries;

/// A Chromium page prepared for snippet measurement
pub struct ChromiumHost {
    page: Page,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    warm_quantum_ms: f64,
    warming: AtomicBool,
}

impl ChromiumHost {
    /// Launch a browser with the given configuration and open a blank page
    ///
    /// # Example
    ///
    /// ```no_run
    /// use chromiumoxide::browser::BrowserConfig;
    /// use snippet_bench::browser::ChromiumHost;
    /// use std::time::Duration;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = BrowserConfig::builder()
    ///     .build()
    ///     .map_err(|e| anyhow::anyhow!(e))?;
    /// let host = ChromiumHost::launch(config, Duration::from_millis(1)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn launch(config: BrowserConfig, warm_quantum: Duration) -> Result<Self> {
        info!("Launching browser for snippet measurement");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BenchError::host(format!("failed to launch browser: {}", e)))?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handle.abort();
                return Err(BenchError::host(format!("failed to open page: {}", e)));
            }
        };

        let mut host = Self::from_page(page, warm_quantum).await?;
        host.browser = Some(browser);
        host.handler = Some(handle);
        info!("Browser launched successfully");
        Ok(host)
    }

    /// Prepare an already open page; the caller keeps ownership of its browser.
    ///
    /// Replaces the page's body with the render target.
    pub async fn from_page(page: Page, warm_quantum: Duration) -> Result<Self> {
        let host = Self {
            page,
            browser: None,
            handler: None,
            warm_quantum_ms: warm_quantum.as_secs_f64() * 1000.0,
            warming: AtomicBool::new(false),
        };
        host.eval(script::SETUP).await?;
        debug!(target_id = script::TARGET_ID, "Render target installed");
        Ok(host)
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Slow the renderer down `rate` times via `Emulation.setCPUThrottlingRate`.
    ///
    /// Stretching every phase lifts cheap snippets further above the clock's
    /// resolution. `1.0` restores full speed.
    #[instrument(skip(self))]
    pub async fn throttle_cpu(&self, rate: f64) -> Result<()> {
        check_throttle_rate(rate)?;
        let params = SetCpuThrottlingRateParams::builder()
            .rate(rate)
            .build()
            .map_err(BenchError::host)?;
        self.page.execute(params).await.map_err(BenchError::host)?;
        debug!(rate, "CPU throttling applied");
        Ok(())
    }

    /// Close the browser if this host launched it
    pub async fn close(mut self) -> Result<()> {
        if let Some(mut browser) = self.browser.take() {
            browser.close().await.map_err(BenchError::host)?;
            let _ = browser.wait().await;
        }
        if let Some(handle) = self.handler.take() {
            handle.abort();
        }
        Ok(())
    }

    async fn eval(&self, expression: impl Into<String>) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(expression.into())
            .await
            .map_err(BenchError::host)?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

fn check_throttle_rate(rate: f64) -> Result<()> {
    if !(rate >= 1.0) {
        return Err(BenchError::config(format!(
            "CPU throttling rate must be >= 1.0 (got {})",
            rate
        )));
    }
    Ok(())
}

impl Drop for ChromiumHost {
    fn drop(&mut self) {
        if let Some(handle) = self.handler.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl RenderHost for ChromiumHost {
    async fn clear(&self) -> Result<()> {
        self.eval(script::CLEAR).await.map(drop)
    }

    #[instrument(skip_all, fields(bytes = markup.len()))]
    async fn inject(&self, markup: &str) -> Result<()> {
        self.eval(script::inject(markup)?).await.map(drop)
    }

    async fn force_style(&self) -> Result<()> {
        self.eval(script::FORCE_STYLE).await.map(drop)
    }

    async fn force_layout(&self) -> Result<()> {
        self.eval(script::FORCE_LAYOUT).await.map(drop)
    }

    #[instrument(skip_all, fields(bytes = markup.len()))]
    async fn render_timed(
        &self,
        markup: &str,
        separate_style_pass: bool,
    ) -> Result<Option<Boundaries>> {
        let value = self
            .eval(script::render_timed(markup, separate_style_pass)?)
            .await?;
        parse_boundaries(&value).map(Some)
    }
}

fn parse_boundaries(value: &serde_json::Value) -> Result<Boundaries> {
    let [start_parse, start_style, start_layout, start_paint, end_paint]: [f64; 5] =
        serde_json::from_value(value.clone()).map_err(|e| {
            BenchError::host(format!("render script returned {}: {}", value, e))
        })?;
    Ok(Boundaries {
        start_parse,
        start_style,
        start_layout,
        start_paint,
        end_paint,
    })
}

#[async_trait]
impl Clock for ChromiumHost {
    async fn now(&self) -> Result<f64> {
        let value = self.eval(script::NOW).await?;
        value
            .as_f64()
            .ok_or_else(|| BenchError::host(format!("performance.now() returned {}", value)))
    }
}

#[async_trait]
impl Scheduler for ChromiumHost {
    async fn next_frame(&self) -> Result<()> {
        self.eval(script::NEXT_FRAME).await.map(drop)
    }

    async fn delay(&self, duration: Duration) -> Result<()> {
        self.eval(script::delay(duration.as_secs_f64() * 1000.0))
            .await
            .map(drop)
    }
}

#[async_trait]
impl Warmer for ChromiumHost {
    async fn start(&self) -> Result<()> {
        if self.warming.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.eval(script::start_warming(self.warm_quantum_ms)).await?;
        self.warming.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.warming.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.eval(script::STOP_WARMING).await?;
        self.warming.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.warming.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TraceSink for ChromiumHost {
    async fn mark(&self, name: &str, timestamp: f64) -> Result<()> {
        self.eval(script::mark(name, timestamp)?).await.map(drop)
    }
}
