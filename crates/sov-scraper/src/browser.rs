//! Headless browser pool and page rendering.
//!
//! [`BrowserPool`] hands out scoped [`BrowserLease`]s over one lazily-launched
//! shared browser. Capacity is fixed by a semaphore; every dropped lease counts
//! one use against the browser it was taken from, and once `recycle_after`
//! uses have accumulated the next [`BrowserPool::acquire`] closes the browser
//! and launches a fresh one.

use std::ops::Deref;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::error::ScraperError;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";

/// Device emulation applied to a page before navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderProfile {
    /// 1920x1080, desktop Chrome user agent.
    Desktop,
    /// 390x844, mobile Safari user agent.
    Mobile,
}

impl RenderProfile {
    #[must_use]
    pub fn viewport(self) -> (u32, u32) {
        match self {
            RenderProfile::Desktop => (1920, 1080),
            RenderProfile::Mobile => (390, 844),
        }
    }

    #[must_use]
    pub fn user_agent(self) -> &'static str {
        match self {
            RenderProfile::Desktop => DESKTOP_USER_AGENT,
            RenderProfile::Mobile => MOBILE_USER_AGENT,
        }
    }

    #[must_use]
    pub fn is_mobile(self) -> bool {
        matches!(self, RenderProfile::Mobile)
    }
}

/// Renders a URL to its post-JavaScript HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScraperError::Timeout`] when rendering exceeds `timeout`, or
    /// [`ScraperError::BrowserUnavailable`] when no browser can be launched,
    /// or [`ScraperError::Browser`] on navigation failures.
    async fn render(
        &self,
        url: &str,
        profile: RenderProfile,
        timeout: Duration,
    ) -> Result<String, ScraperError>;
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Starts and stops browser instances for a [`BrowserPool`].
#[async_trait]
pub trait BrowserLauncher: Send + Sync + 'static {
    type Instance: Send + Sync + 'static;

    async fn launch(&self) -> Result<Self::Instance, ScraperError>;

    async fn close(&self, instance: Self::Instance);
}

/// Uses of the current browser. `generation` moves on every recycle or
/// shutdown so leases of a retired browser stop counting.
#[derive(Debug, Default)]
struct UseCounter {
    generation: u64,
    uses: u32,
}

type SharedUses = Arc<std::sync::Mutex<UseCounter>>;

fn lock_uses(usage: &std::sync::Mutex<UseCounter>) -> MutexGuard<'_, UseCounter> {
    usage.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct BrowserPool<L: BrowserLauncher> {
    launcher: L,
    permits: Arc<Semaphore>,
    current: Mutex<Option<Arc<L::Instance>>>,
    usage: SharedUses,
    recycle_after: u32,
}

/// Scoped access to the shared browser. Dropping it releases the capacity
/// permit and counts one use toward recycling the browser it was taken from.
pub struct BrowserLease<I> {
    instance: Arc<I>,
    usage: SharedUses,
    generation: u64,
    _permit: OwnedSemaphorePermit,
}

impl<I> Deref for BrowserLease<I> {
    type Target = I;

    fn deref(&self) -> &I {
        &self.instance
    }
}

impl<I> Drop for BrowserLease<I> {
    fn drop(&mut self) {
        let mut usage = lock_uses(&self.usage);
        if usage.generation == self.generation {
            usage.uses += 1;
        }
    }
}

impl<L: BrowserLauncher> BrowserPool<L> {
    #[must_use]
    pub fn new(launcher: L, capacity: usize, recycle_after: u32) -> Self {
        Self {
            launcher,
            permits: Arc::new(Semaphore::new(capacity.max(1))),
            current: Mutex::new(None),
            usage: SharedUses::default(),
            recycle_after: recycle_after.max(1),
        }
    }

    /// Waits for capacity, then returns a lease on the shared browser,
    /// launching or recycling it first when needed.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::BrowserUnavailable`] if the pool is closed or
    /// the browser cannot be launched.
    pub async fn acquire(&self) -> Result<BrowserLease<L::Instance>, ScraperError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| ScraperError::BrowserUnavailable(format!("browser pool closed: {e}")))?;

        let mut retired = None;
        let (instance, generation) = {
            let mut current = self.current.lock().await;
            if current.is_some() && lock_uses(&self.usage).uses >= self.recycle_after {
                retired = current.take();
                self.next_generation();
            }
            let instance = match current.as_ref() {
                Some(instance) => Arc::clone(instance),
                None => {
                    let instance = Arc::new(self.launcher.launch().await?);
                    *current = Some(Arc::clone(&instance));
                    instance
                }
            };
            (instance, lock_uses(&self.usage).generation)
        };

        if let Some(old) = retired {
            self.retire(old).await;
        }

        Ok(BrowserLease {
            instance,
            usage: Arc::clone(&self.usage),
            generation,
            _permit: permit,
        })
    }

    /// Closes the shared browser, if any. The next acquire launches a new one.
    pub async fn shutdown(&self) {
        let old = {
            let mut current = self.current.lock().await;
            self.next_generation();
            current.take()
        };
        if let Some(old) = old {
            self.retire(old).await;
        }
    }

    /// Uses counted since the current browser was launched.
    #[must_use]
    pub fn uses(&self) -> u32 {
        lock_uses(&self.usage).uses
    }

    fn next_generation(&self) {
        let mut usage = lock_uses(&self.usage);
        usage.generation += 1;
        usage.uses = 0;
    }

    async fn retire(&self, old: Arc<L::Instance>) {
        match Arc::try_unwrap(old) {
            Ok(instance) => {
                tracing::debug!("recycling browser instance");
                self.launcher.close(instance).await;
            }
            // Still leased elsewhere; released when the last lease drops.
            Err(_) => tracing::debug!("retired browser still leased, deferring close"),
        }
    }
}

// ---------------------------------------------------------------------------
// Chromium
// ---------------------------------------------------------------------------

/// A running Chromium process plus the task polling its CDP connection.
pub struct ChromeInstance {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher;

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    type Instance = ChromeInstance;

    async fn launch(&self) -> Result<ChromeInstance, ScraperError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--lang=ko-KR")
            .window_size(1920, 1080)
            .build()
            .map_err(|e| ScraperError::BrowserUnavailable(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::BrowserUnavailable(format!("launch failed: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!("launched headless browser");
        Ok(ChromeInstance { browser, handler })
    }

    async fn close(&self, mut instance: ChromeInstance) {
        if let Err(e) = instance.browser.close().await {
            tracing::warn!(error = %e, "browser close error");
        }
        if let Err(e) = instance.browser.wait().await {
            tracing::debug!(error = %e, "browser wait error");
        }
        instance.handler.abort();
    }
}

/// [`PageRenderer`] backed by a pooled Chromium instance.
pub struct ChromeRenderer {
    pool: BrowserPool<ChromeLauncher>,
    settle: Duration,
}

impl ChromeRenderer {
    /// `settle` is the extra wait after navigation for late network activity.
    #[must_use]
    pub fn new(capacity: usize, recycle_after: u32, settle: Duration) -> Self {
        Self {
            pool: BrowserPool::new(ChromeLauncher, capacity, recycle_after),
            settle,
        }
    }

    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    async fn load(
        &self,
        page: &Page,
        url: &str,
        profile: RenderProfile,
    ) -> Result<String, ScraperError> {
        let (width, height) = profile.viewport();
        page.execute(SetUserAgentOverrideParams::new(profile.user_agent()))
            .await
            .map_err(|e| ScraperError::Browser(format!("set user agent: {e}")))?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(width),
            i64::from(height),
            1.0,
            profile.is_mobile(),
        ))
        .await
        .map_err(|e| ScraperError::Browser(format!("set viewport: {e}")))?;

        page.goto(url)
            .await
            .map_err(|e| ScraperError::Browser(format!("navigation to {url} failed: {e}")))?;
        if let Err(e) = page.wait_for_navigation().await {
            tracing::debug!(url, error = %e, "wait_for_navigation failed");
        }
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        page.content()
            .await
            .map_err(|e| ScraperError::Browser(format!("read content of {url}: {e}")))
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(
        &self,
        url: &str,
        profile: RenderProfile,
        timeout: Duration,
    ) -> Result<String, ScraperError> {
        let lease = self.pool.acquire().await?;
        let page = lease
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::Browser(format!("open page: {e}")))?;

        let result = tokio::time::timeout(timeout, self.load(&page, url, profile))
            .await
            .unwrap_or_else(|_| {
                Err(ScraperError::Timeout {
                    stage: "render",
                    secs: timeout.as_secs(),
                })
            });

        if let Err(e) = page.close().await {
            tracing::debug!(url, error = %e, "page close error");
        }
        drop(lease);
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingLauncher {
        launched: AtomicU32,
        closed: Arc<AtomicU32>,
        fail: bool,
    }

    #[async_trait]
    impl BrowserLauncher for CountingLauncher {
        type Instance = u32;

        async fn launch(&self) -> Result<u32, ScraperError> {
            if self.fail {
                return Err(ScraperError::Browser("no chrome".to_string()));
            }
            Ok(self.launched.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn close(&self, _instance: u32) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn profiles_have_fixed_viewports() {
        assert_eq!(RenderProfile::Desktop.viewport(), (1920, 1080));
        assert_eq!(RenderProfile::Mobile.viewport(), (390, 844));
        assert!(RenderProfile::Mobile.user_agent().contains("iPhone"));
        assert!(!RenderProfile::Desktop.is_mobile());
    }

    #[tokio::test]
    async fn launches_lazily_and_shares_instance() {
        let pool = BrowserPool::new(CountingLauncher::default(), 2, 10);
        assert_eq!(pool.launcher.launched.load(Ordering::SeqCst), 0);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_eq!(*a, 1);
        assert_eq!(*b, 1);
        assert_eq!(pool.launcher.launched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_lease_counts_a_use_and_frees_capacity() {
        let pool = BrowserPool::new(CountingLauncher::default(), 1, 10);
        {
            let _lease = pool.acquire().await.unwrap();
            assert_eq!(pool.permits.available_permits(), 0);
        }
        assert_eq!(pool.permits.available_permits(), 1);
        assert_eq!(pool.uses(), 1);
    }

    #[tokio::test]
    async fn recycles_after_threshold() {
        let pool = BrowserPool::new(CountingLauncher::default(), 1, 2);
        for _ in 0..2 {
            let lease = pool.acquire().await.unwrap();
            assert_eq!(*lease, 1);
        }
        let lease = pool.acquire().await.unwrap();
        assert_eq!(*lease, 2);
        assert_eq!(pool.launcher.closed.load(Ordering::SeqCst), 1);
        drop(lease);
        assert_eq!(pool.uses(), 1);
    }

    #[tokio::test]
    async fn launch_failure_releases_permit() {
        let launcher = CountingLauncher {
            fail: true,
            ..CountingLauncher::default()
        };
        let pool = BrowserPool::new(launcher, 1, 5);
        assert!(matches!(
            pool.acquire().await,
            Err(ScraperError::BrowserUnavailable(_))
        ));
        assert_eq!(pool.permits.available_permits(), 1);
    }

    #[tokio::test]
    async fn lease_from_retired_browser_does_not_count_against_replacement() {
        let pool = BrowserPool::new(CountingLauncher::default(), 2, 2);
        drop(pool.acquire().await.unwrap());
        let stale = pool.acquire().await.unwrap();
        drop(pool.acquire().await.unwrap());
        assert_eq!(pool.uses(), 2);

        let fresh = pool.acquire().await.unwrap();
        assert_eq!(*fresh, 2);
        assert_eq!(*stale, 1);
        drop(stale);
        assert_eq!(pool.uses(), 0);

        drop(fresh);
        assert_eq!(pool.uses(), 1);
    }

    #[tokio::test]
    async fn shutdown_closes_idle_browser() {
        let pool = BrowserPool::new(CountingLauncher::default(), 1, 5);
        drop(pool.acquire().await.unwrap());
        pool.shutdown().await;
        assert_eq!(pool.launcher.closed.load(Ordering::SeqCst), 1);
        assert_eq!(pool.uses(), 0);
    }
}
