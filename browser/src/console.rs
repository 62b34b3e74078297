use crate::{
    create_browser,
    parse_usage_row,
    selectors,
    wait_for_element,
    ConsoleError,
};
use chromiumoxide::{
    cdp::browser_protocol::page::CaptureScreenshotFormat,
    page::ScreenshotParams,
    Browser,
    Element,
    Handler,
    Page,
};
use eyre::{
    Context as _,
    OptionExt as _,
    Result,
};
use futures::StreamExt as _;
use secrecy::ExposeSecret as _;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;
use usage_exporter_config::BrowserConfig;
use usage_exporter_core::{
    Credentials,
    SessionClient,
    UsageRecord,
};

/// How long to look for the one-time code prompt when no code is configured.
const ONE_TIME_CODE_PROBE: Duration = Duration::from_secs(2);

/// Session client that drives the cloud console in a Chromium instance.
///
/// The browser is started lazily on the first login and started again on a
/// later login if it went away in the meantime.
#[derive(Debug)]
pub struct ConsoleClient {
    config: BrowserConfig,
    session: Option<BrowserSession>,
}

#[derive(Debug)]
struct BrowserSession {
    browser: Browser,
    page: Page,
    events: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: &BrowserConfig) -> Result<Self> {
        let (mut browser, handler) = create_browser(config).await?;
        let events = drive_browser_events(handler);

        match browser.new_page("about:blank").await {
            Ok(page) => Ok(Self { browser, page, events }),
            Err(err) => {
                kill(&mut browser).await;
                events.abort();
                Err(err).context("failed to create new page")
            }
        }
    }

    fn is_alive(&self) -> bool {
        !self.events.is_finished()
    }

    async fn shutdown(mut self) {
        kill(&mut self.browser).await;
        self.events.abort();
    }
}

async fn kill(browser: &mut Browser) {
    match browser.kill().await {
        Some(Ok(_)) => debug!("browser killed"),
        Some(Err(err)) => error!("failed to kill browser: {err}"),
        None => debug!("browser process not found"),
    }
}

fn drive_browser_events(mut handler: Handler) -> JoinHandle<()> {
    tokio::task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(err) = event {
                if err.to_string().contains("ResetWithoutClosingHandshake") {
                    error!("Browser unexpectedly closed");
                    break;
                }
                error!("error in browser handler: {err:?}");
            }
        }
        debug!("Browser event handler stopped");
    })
}

impl ConsoleClient {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config, session: None }
    }

    /// The open page, starting a fresh browser if there is none or it died.
    async fn page(&mut self) -> Result<&Page> {
        if !self.session.as_ref().is_some_and(BrowserSession::is_alive) {
            if let Some(dead) = self.session.take() {
                warn!("browser went away, starting a new one");
                dead.shutdown().await;
            }
            self.session = Some(BrowserSession::launch(&self.config).await?);
        }
        self.session
            .as_ref()
            .map(|session| &session.page)
            .ok_or_eyre("browser session missing")
    }

    fn usage_url(&self) -> Result<Url> {
        self.config
            .console_url
            .join("usage")
            .context("invalid console url")
    }
}

impl SessionClient for ConsoleClient {
    #[instrument(level = "debug", skip_all, fields(username = %credentials.username))]
    async fn login(&mut self, credentials: &Credentials, one_time_code: Option<&str>) -> Result<()> {
        info!("Logging into the cloud console as {} ...", credentials.username);
        let console_url = self.config.console_url.clone();
        let timeout = self.config.element_timeout();
        let page = self.page().await?;

        page.goto(console_url.as_str())
            .await
            .context("failed to navigate to the console")?;

        // A profile with a still valid cookie lands directly in the console.
        let username_input = match wait_for_element(page, selectors::login::USERNAME_INPUT, timeout).await {
            Ok(input) => input,
            Err(err) => {
                if is_on_console(page, &console_url).await {
                    info!("console session is still valid");
                    return Ok(());
                }
                return Err(err);
            }
        };
        let password_input = wait_for_element(page, selectors::login::PASSWORD_INPUT, timeout).await?;
        let submit_button = wait_for_element(page, selectors::login::SUBMIT_BUTTON, timeout).await?;

        fill(&username_input, &credentials.username)
            .await
            .context("failed to enter username")?;
        fill(&password_input, credentials.password.expose_secret())
            .await
            .context("failed to enter password")?;
        submit_button.click().await.context("failed to submit login")?;
        debug!("submitted login form");

        match one_time_code {
            Some(code) => {
                let code_input = wait_for_element(page, selectors::login::ONE_TIME_CODE_INPUT, timeout).await?;
                fill(&code_input, code)
                    .await
                    .context("failed to enter one-time code")?;
                wait_for_element(page, selectors::login::VERIFY_BUTTON, timeout)
                    .await?
                    .click()
                    .await
                    .context("failed to submit one-time code")?;
                debug!("submitted one-time code");
            }
            None => {
                if wait_for_element(page, selectors::login::ONE_TIME_CODE_INPUT, ONE_TIME_CODE_PROBE)
                    .await
                    .is_ok()
                {
                    return Err(ConsoleError::OneTimeCodeRequired.into());
                }
            }
        }

        page.wait_for_navigation()
            .await
            .context("console did not load after login")?;

        Ok(())
    }

    #[instrument(level = "debug", skip_all)]
    async fn fetch_usage(&mut self) -> Result<Vec<UsageRecord>> {
        info!("Fetching usage summary ...");
        let usage_url = self.usage_url()?;
        let timeout = self.config.element_timeout();
        let settle = self.config.settle_delay();
        let page = self.page().await?;

        page.goto(usage_url.as_str())
            .await
            .context("failed to navigate to the usage page")?;

        // Otherwise we find the placeholder table that gets replaced shortly after.
        tokio::time::sleep(settle).await;

        let table = wait_for_element(page, selectors::usage::TABLE, timeout).await?;
        let rows = table
            .find_elements(selectors::usage::ROWS)
            .await
            .context("failed to list usage rows")?;

        let mut usage = Vec::with_capacity(rows.len());
        for row in rows {
            let project = text_of(&row, selectors::usage::PROJECT_NAME).await?;
            let total = text_of(&row, selectors::usage::PROJECT_TOTAL).await?;
            usage.push(parse_usage_row(&project, &total)?);
        }

        debug!(rows = usage.len(), "read usage table");
        Ok(usage)
    }

    async fn capture_diagnostic(&self) -> Result<Vec<u8>> {
        let session = self.session.as_ref().ok_or(ConsoleError::NoPage)?;
        session
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .context("failed to take screenshot")
    }
}

async fn fill(input: &Element, text: &str) -> Result<()> {
    input
        .click()
        .await?
        .call_js_fn("function() { this.value = ''; }", true)
        .await?;
    input.type_str(text).await?;
    Ok(())
}

async fn text_of(row: &Element, selector: &str) -> Result<String> {
    let cell = row
        .find_element(selector)
        .await
        .map_err(|_| ConsoleError::ElementNotFound(selector.to_string()))?;
    Ok(cell.inner_text().await?.unwrap_or_default())
}

async fn is_on_console(page: &Page, console_url: &Url) -> bool {
    match page.url().await {
        Ok(Some(current)) => Url::parse(&current).is_ok_and(|current| current.host() == console_url.host()),
        _ => false,
    }
}
