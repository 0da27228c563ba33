use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::data_models::JobListing;
use crate::error::UpstreamError;

const SERVICE: &str = "linkedin job search";

/// A provider of job listings for a free-text query.
///
/// The router only talks to this trait, so the browser scraper can be swapped
/// for an official jobs API without touching handlers.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_jobs(&self, query: &str) -> Result<Vec<JobListing>, UpstreamError>;
}

struct CardSelectors {
    container: Selector,
    item: Selector,
    title: Selector,
    company: Selector,
    location: Selector,
    link: Selector,
    posted: Selector,
}

static SELECTORS: OnceLock<CardSelectors> = OnceLock::new();

fn selectors() -> &'static CardSelectors {
    SELECTORS.get_or_init(|| {
        let parse = |css: &str| Selector::parse(css).expect("static selector must parse");
        CardSelectors {
            container: parse(".jobs-search__results-list"),
            item: parse("li"),
            title: parse(".base-search-card__title"),
            company: parse(".base-search-card__subtitle"),
            location: parse(".job-search-card__location"),
            link: parse(".base-card__full-link"),
            posted: parse("time"),
        }
    })
}

/// Builds the public job search URL; spaces become `+`.
pub fn search_url(base: &str, query: &str) -> Result<Url, UpstreamError> {
    Url::parse_with_params(base, &[("keywords", query.trim())])
        .map_err(|e| UpstreamError::Browser(format!("invalid job search url {base:?}: {e}")))
}

/// Extracts job cards from a rendered results page.
///
/// A card missing any required field is skipped; it never aborts the rest.
pub fn parse_job_listings(html: &str) -> Vec<JobListing> {
    let document = Html::parse_document(html);
    let sel = selectors();
    let mut listings = Vec::new();

    for container in document.select(&sel.container) {
        for card in container.select(&sel.item) {
            match extract_listing(card, sel) {
                Ok(listing) => listings.push(listing),
                Err(missing) => {
                    tracing::debug!(missing, "skipping job card with missing field");
                }
            }
        }
    }

    listings
}

fn extract_listing(card: ElementRef<'_>, sel: &CardSelectors) -> Result<JobListing, &'static str> {
    let title = text_of(card, &sel.title).ok_or("title")?;
    let company = text_of(card, &sel.company).ok_or("company")?;
    let location = text_of(card, &sel.location).ok_or("location")?;
    let job_link = card
        .select(&sel.link)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .ok_or("job_link")?;
    let posted_time = text_of(card, &sel.posted);

    Ok(JobListing::new(title, company, location, job_link, posted_time))
}

fn text_of(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|el| el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

/// Upper bound on closing, and separately on killing, a browser process.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// One live browser process.
#[async_trait]
trait BrowserSession: Send + Sync {
    /// Opens `url`, waits `render_wait` and returns the rendered HTML.
    async fn capture(&self, url: &str, render_wait: Duration) -> Result<String, UpstreamError>;

    /// Graceful shutdown: asks the browser to exit and reaps the process.
    async fn close(&mut self) -> Result<(), String>;

    /// Forced shutdown.
    async fn kill(&mut self);
}

#[async_trait]
trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, UpstreamError>;
}

struct ChromiumLauncher {
    headless: bool,
}

impl ChromiumLauncher {
    fn browser_config(&self) -> Result<BrowserConfig, UpstreamError> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .window_size(1920, 1080);
        if !self.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(UpstreamError::Browser)
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, UpstreamError> {
        let (browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| UpstreamError::Browser(format!("launch failed: {e}")))?;

        // The handler drives the CDP connection and must be polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler event error");
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn capture(&self, url: &str, render_wait: Duration) -> Result<String, UpstreamError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| UpstreamError::Browser(format!("navigation to {url} failed: {e}")))?;

        // No readiness signal is exposed by the results page; give client-side
        // rendering a fixed window.
        tokio::time::sleep(render_wait).await;

        let html = page
            .content()
            .await
            .map_err(|e| UpstreamError::Browser(format!("capturing page content failed: {e}")))?;

        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "failed to close tab");
        }
        Ok(html)
    }

    async fn close(&mut self) -> Result<(), String> {
        self.browser.close().await.map_err(|e| e.to_string())?;
        self.browser.wait().await.map_err(|e| e.to_string())?;
        self.handler_task.abort();
        Ok(())
    }

    async fn kill(&mut self) {
        if let Some(Err(e)) = self.browser.kill().await {
            tracing::warn!(error = %e, "failed to kill browser process");
        }
        self.handler_task.abort();
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

/// Closes the session, falling back to a kill when closing fails or stalls.
/// Returns within roughly twice `limit` whatever the browser does.
async fn shutdown(session: &mut dyn BrowserSession, limit: Duration) {
    match tokio::time::timeout(limit, session.close()).await {
        Ok(Ok(())) => return,
        Ok(Err(e)) => tracing::warn!(error = %e, "failed to close browser, killing it"),
        Err(_) => tracing::warn!(?limit, "browser did not close in time, killing it"),
    }
    if tokio::time::timeout(limit, session.kill()).await.is_err() {
        tracing::error!(?limit, "browser kill did not complete; process may be leaked");
    }
}

/// Scrapes LinkedIn's public job search through a Chromium session.
pub struct LinkedInScraper {
    base_url: String,
    render_wait: Duration,
    session_timeout: Duration,
    teardown_timeout: Duration,
    launcher: Box<dyn SessionLauncher>,
}

impl LinkedInScraper {
    pub fn new(config: &Config) -> Self {
        Self::with_launcher(
            config,
            Box::new(ChromiumLauncher {
                headless: config.scrape_headless,
            }),
        )
    }

    fn with_launcher(config: &Config, launcher: Box<dyn SessionLauncher>) -> Self {
        Self {
            base_url: config.linkedin_search_url.clone(),
            render_wait: config.scrape_render_wait,
            session_timeout: config.scrape_timeout,
            teardown_timeout: TEARDOWN_TIMEOUT,
            launcher,
        }
    }

    /// Launches a browser, renders `url` and returns the page HTML.
    ///
    /// The browser is shut down on every path out of this function, including
    /// the session timeout, and shutdown itself is bounded.
    async fn render_page(&self, url: &Url) -> Result<String, UpstreamError> {
        let mut session = self.launcher.launch().await?;

        let outcome = tokio::time::timeout(
            self.session_timeout,
            session.capture(url.as_str(), self.render_wait),
        )
        .await;

        shutdown(session.as_mut(), self.teardown_timeout).await;

        match outcome {
            Ok(html) => html,
            Err(_) => Err(UpstreamError::Timeout {
                service: SERVICE,
                after: self.session_timeout,
            }),
        }
    }
}

#[async_trait]
impl JobSource for LinkedInScraper {
    async fn fetch_jobs(&self, query: &str) -> Result<Vec<JobListing>, UpstreamError> {
        let url = search_url(&self.base_url, query)?;
        tracing::info!(%url, "scraping job listings");

        let html = self.render_page(&url).await?;
        let listings = parse_job_listings(&html);

        tracing::info!(query, scraped = listings.len(), "job scrape completed");
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::NOT_AVAILABLE;
    use std::sync::{Arc, Mutex};

    fn card(title: &str, company: &str, location: &str, href: &str, time: Option<&str>) -> String {
        let time = time
            .map(|t| format!("<time datetime=\"2026-10-01\">\n  {t}\n</time>"))
            .unwrap_or_default();
        format!(
            r#"<li><div class="base-card">
                <a class="base-card__full-link" href="{href}"></a>
                <h3 class="base-search-card__title">
                    {title}
                </h3>
                <h4 class="base-search-card__subtitle"><a>{company}</a></h4>
                <span class="job-search-card__location">{location}</span>
                {time}
            </div></li>"#
        )
    }

    fn page(cards: &[String]) -> String {
        format!(
            r#"<html><body><ul class="jobs-search__results-list">{}</ul></body></html>"#,
            cards.join("\n")
        )
    }

    #[test]
    fn test_search_url_plus_encodes_spaces() {
        let url = search_url("https://www.linkedin.com/jobs/search", "rust developer").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.linkedin.com/jobs/search?keywords=rust+developer"
        );
    }

    #[test]
    fn test_search_url_escapes_reserved_characters() {
        let url = search_url("https://www.linkedin.com/jobs/search", "c++ & go").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.linkedin.com/jobs/search?keywords=c%2B%2B+%26+go"
        );
    }

    #[test]
    fn test_search_url_rejects_bad_base() {
        assert!(search_url("not a url", "rust").is_err());
    }

    #[test]
    fn test_parse_extracts_all_fields() {
        let html = page(&[card(
            "Senior Rust Engineer",
            "Ferrous Systems",
            "Berlin, Germany",
            "https://www.linkedin.com/jobs/view/1",
            Some("2 days ago"),
        )]);
        let jobs = parse_job_listings(&html);
        assert_eq!(
            jobs,
            vec![JobListing {
                title: "Senior Rust Engineer".to_string(),
                company: "Ferrous Systems".to_string(),
                location: "Berlin, Germany".to_string(),
                job_link: "https://www.linkedin.com/jobs/view/1".to_string(),
                posted_time: "2 days ago".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_defaults_posted_time() {
        let html = page(&[card("Dev", "Acme", "Remote", "https://x/1", None)]);
        let jobs = parse_job_listings(&html);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].posted_time, NOT_AVAILABLE);
    }

    #[test]
    fn test_parse_skips_incomplete_cards_and_continues() {
        let html = page(&[
            card("First", "Acme", "Remote", "https://x/1", Some("1 day ago")),
            card("", "NoTitle Inc", "Remote", "https://x/2", None),
            card("No Link", "Acme", "Remote", "", None),
            card("No Company", "", "Remote", "https://x/4", None),
            card("Last", "Initech", "Austin, TX", "https://x/5", None),
        ]);
        let titles: Vec<String> = parse_job_listings(&html)
            .into_iter()
            .map(|j| j.title)
            .collect();
        assert_eq!(titles, vec!["First".to_string(), "Last".to_string()]);
    }

    #[test]
    fn test_parse_card_without_location_element_is_skipped() {
        let html = page(&[
            r#"<li><h3 class="base-search-card__title">Dev</h3>
               <h4 class="base-search-card__subtitle">Acme</h4>
               <a class="base-card__full-link" href="https://x/1"></a></li>"#
                .to_string(),
            card("Kept", "Acme", "Remote", "https://x/2", None),
        ]);
        let jobs = parse_job_listings(&html);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Kept");
    }

    #[test]
    fn test_parse_missing_container_is_empty() {
        let html = "<html><body><div class=\"authwall\">Sign in</div></body></html>";
        assert!(parse_job_listings(html).is_empty());
    }

    #[test]
    fn test_parse_empty_container_is_empty() {
        assert!(parse_job_listings(&page(&[])).is_empty());
    }

    #[test]
    fn test_parse_garbage_input_is_empty() {
        assert!(parse_job_listings("").is_empty());
        assert!(parse_job_listings("<<<not html").is_empty());
    }

    // Browser session lifecycle

    #[derive(Clone, Copy)]
    enum Step {
        Succeed,
        Fail,
        Hang,
    }

    type Events = Arc<Mutex<Vec<String>>>;

    struct FakeLauncher {
        launch: Step,
        capture: Step,
        close: Step,
        html: String,
        events: Events,
    }

    struct FakeSession {
        capture: Step,
        close: Step,
        html: String,
        events: Events,
    }

    fn record(events: &Events, event: impl Into<String>) {
        events.lock().unwrap().push(event.into());
    }

    #[async_trait]
    impl SessionLauncher for FakeLauncher {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>, UpstreamError> {
            record(&self.events, "launch");
            match self.launch {
                Step::Succeed => Ok(Box::new(FakeSession {
                    capture: self.capture,
                    close: self.close,
                    html: self.html.clone(),
                    events: self.events.clone(),
                })),
                Step::Fail => Err(UpstreamError::Browser("launch failed: no chrome".into())),
                Step::Hang => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn capture(&self, url: &str, _render_wait: Duration) -> Result<String, UpstreamError> {
            record(&self.events, format!("capture {url}"));
            match self.capture {
                Step::Succeed => Ok(self.html.clone()),
                Step::Fail => Err(UpstreamError::Browser("tab crashed".into())),
                Step::Hang => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<(), String> {
            record(&self.events, "close");
            match self.close {
                Step::Succeed => Ok(()),
                Step::Fail => Err("request timed out".to_string()),
                Step::Hang => std::future::pending().await,
            }
        }

        async fn kill(&mut self) {
            record(&self.events, "kill");
        }
    }

    fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "GOOGLE_API_KEY" | "GOOGLE_CSE_ID" | "YOUTUBE_API_KEY" | "GROQ_API_KEY" => {
                Some("test".to_string())
            }
            "LINKEDIN_SEARCH_URL" => Some("https://jobs.example/search".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn scraper(launch: Step, capture: Step, close: Step) -> (LinkedInScraper, Events) {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let launcher = FakeLauncher {
            launch,
            capture,
            close,
            html: page(&[card("Rust Dev", "Acme", "Remote", "https://x/1", None)]),
            events: events.clone(),
        };
        (
            LinkedInScraper::with_launcher(&test_config(), Box::new(launcher)),
            events,
        )
    }

    fn events_of(events: &Events) -> Vec<String> {
        events.lock().unwrap().clone()
    }

    const CAPTURE: &str = "capture https://jobs.example/search?keywords=rust+developer";

    #[tokio::test(start_paused = true)]
    async fn test_fetch_jobs_renders_parses_and_closes() {
        let (scraper, events) = scraper(Step::Succeed, Step::Succeed, Step::Succeed);
        let jobs = scraper.fetch_jobs("rust developer").await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Rust Dev");
        assert_eq!(events_of(&events), vec!["launch", CAPTURE, "close"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_error_still_closes_browser() {
        let (scraper, events) = scraper(Step::Succeed, Step::Fail, Step::Succeed);
        let err = scraper.fetch_jobs("rust developer").await.unwrap_err();
        assert!(err.to_string().contains("tab crashed"), "{err}");
        assert_eq!(events_of(&events), vec!["launch", CAPTURE, "close"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_capture_times_out_and_closes_browser() {
        let (scraper, events) = scraper(Step::Succeed, Step::Hang, Step::Succeed);
        let err = scraper.fetch_jobs("rust developer").await.unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        assert_eq!(events_of(&events), vec!["launch", CAPTURE, "close"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_close_falls_back_to_kill() {
        let (scraper, events) = scraper(Step::Succeed, Step::Succeed, Step::Fail);
        assert_eq!(scraper.fetch_jobs("rust developer").await.unwrap().len(), 1);
        assert_eq!(events_of(&events), vec!["launch", CAPTURE, "close", "kill"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wedged_browser_after_timeout_is_killed() {
        let (scraper, events) = scraper(Step::Succeed, Step::Hang, Step::Hang);
        let err = scraper.fetch_jobs("rust developer").await.unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        assert_eq!(events_of(&events), vec!["launch", CAPTURE, "close", "kill"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_surfaces_browser_error() {
        let (scraper, events) = scraper(Step::Fail, Step::Succeed, Step::Succeed);
        let err = scraper.fetch_jobs("rust developer").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Browser(_)), "{err:?}");
        assert_eq!(events_of(&events), vec!["launch"]);
    }
}
