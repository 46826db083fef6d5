//! Headless Chromium backend
//!
//! Drives Chromium over the DevTools protocol with `chromiumoxide`. The protocol
//! handler stream must be polled continuously, so it runs on its own tokio task for
//! the lifetime of the browser.

use super::{Browser, BrowserError, BrowserResult, BrowsingContext};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::task::JoinHandle;

/// Chromium instance handing out tabs as browsing contexts
pub struct ChromeBrowser {
    browser: CdpBrowser,
    handler: JoinHandle<()>,
    tabs: Mutex<OwnedTabs>,
}

/// Target ids of the tabs this browser handed out and has not closed successfully
#[derive(Debug, Default)]
struct OwnedTabs {
    targets: HashSet<String>,
}

impl OwnedTabs {
    fn opened(&mut self, target: &str) {
        self.targets.insert(target.to_string());
    }

    fn closed(&mut self, target: &str) {
        self.targets.remove(target);
    }

    /// Owned tabs among the targets Chromium reports as live
    fn live_count<'a>(&self, live: impl IntoIterator<Item = &'a str>) -> usize {
        live.into_iter()
            .filter(|target| self.targets.contains(*target))
            .count()
    }
}

/// One Chromium tab
#[derive(Clone)]
pub struct ChromeContext {
    page: Page,
}

impl ChromeBrowser {
    /// Launches Chromium with the configured mode and binary
    ///
    /// # Returns
    ///
    /// * `Ok(ChromeBrowser)` - Browser is running and its handler is being polled
    /// * `Err(BrowserError::Launch)` - Chromium could not be started
    pub async fn launch(config: &BrowserConfig) -> BrowserResult<Self> {
        let mut builder = CdpConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage");

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }

        let cdp_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        tracing::info!("Browser launched (headless: {})", config.headless);

        Ok(Self {
            browser,
            handler,
            tabs: Mutex::new(OwnedTabs::default()),
        })
    }

    fn tabs(&self) -> BrowserResult<std::sync::MutexGuard<'_, OwnedTabs>> {
        self.tabs
            .lock()
            .map_err(|_| BrowserError::Command("tab registry poisoned".to_string()))
    }

    /// Closes the browser process and stops the handler task
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Browser process wait failed: {}", e);
        }
        self.handler.abort();
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    type Context = ChromeContext;

    async fn open_context(&self) -> BrowserResult<Self::Context> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Command(format!("new tab: {}", e)))?;
        self.tabs()?.opened(page.target_id().inner());
        Ok(ChromeContext { page })
    }

    async fn close_context(&self, context: Self::Context) -> BrowserResult<()> {
        let target = context.page.target_id().inner().clone();
        context
            .page
            .close()
            .await
            .map_err(|e| BrowserError::Command(format!("close tab {}: {}", target, e)))?;
        // A tab that failed to close stays registered and keeps being counted
        self.tabs()?.closed(&target);
        Ok(())
    }

    /// Counts the tabs handed out by this browser that Chromium still reports
    async fn open_context_count(&self) -> BrowserResult<usize> {
        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| BrowserError::Command(format!("list tabs: {}", e)))?;
        let live: Vec<String> = pages
            .iter()
            .map(|page| page.target_id().inner().clone())
            .collect();
        Ok(self.tabs()?.live_count(live.iter().map(String::as_str)))
    }
}

#[async_trait]
impl BrowsingContext for ChromeContext {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn html(&self) -> BrowserResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::Command(format!("read content: {}", e)))
    }

    async fn click(&self, selector: &str) -> BrowserResult<bool> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| BrowserError::Command(format!("find {}: {}", selector, e)))?;

        match elements.first() {
            Some(element) => {
                element
                    .click()
                    .await
                    .map_err(|e| BrowserError::Command(format!("click {}: {}", selector, e)))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn stop_loading(&self) -> BrowserResult<()> {
        self.page
            .evaluate("window.stop();")
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Command(format!("stop loading: {}", e)))
    }
}
