//! Playwright browser inspection
//!
//! Each inspection generates a small Node script, runs it with a hard
//! timeout and parses the single JSON line it prints. The script waits for
//! network idle, then polls (bounded) for the runtime-ready log line instead
//! of sleeping.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use docfactory_qa_common::ui::{self, PageObservation};
use serde::Serialize;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::QaConfig;
use crate::error::{QaError, QaResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn from_name(name: &str) -> QaResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(QaError::Config(format!("unknown browser '{}'", other))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Per-inspection options.
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    /// Also wait for a `[quality]` log line before reading the page.
    pub expect_quality: bool,
    /// Capture a diagnostic screenshot under this name.
    pub screenshot_name: Option<String>,
}

/// Something that can load a control page and report what it shows.
#[async_trait]
pub trait PageInspector: Send + Sync {
    async fn inspect(&self, url: &str, options: &InspectOptions) -> QaResult<PageObservation>;
}

/// Values injected into the generated script, JSON-encoded as one object.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptParams<'a> {
    url: &'a str,
    export_button: &'a str,
    log_lines: &'a str,
    status: &'a str,
    ready_tag: &'a str,
    ready_message: &'a str,
    quality_tag: &'a str,
    expect_quality: bool,
    navigation_timeout_ms: u64,
    ready_timeout_ms: u64,
    screenshot_path: Option<String>,
}

/// Reads the service's control page in a headless browser.
#[derive(Debug, Clone)]
pub struct BrowserInspector {
    node_binary: String,
    work_dir: PathBuf,
    browser: Browser,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    navigation_timeout_ms: u64,
    ready_timeout_ms: u64,
    process_timeout: Duration,
    export_button_selector: String,
    log_line_selector: String,
    status_selector: String,
    screenshot_dir: Option<PathBuf>,
    installed: OnceCell<bool>,
}

impl BrowserInspector {
    pub fn from_config(config: &QaConfig) -> QaResult<Self> {
        let browser = &config.browser;
        Ok(Self {
            node_binary: browser.node_binary.clone(),
            work_dir: config.paths.root.clone(),
            browser: Browser::from_name(&browser.browser)?,
            headless: browser.headless,
            viewport_width: browser.viewport_width,
            viewport_height: browser.viewport_height,
            navigation_timeout_ms: browser.navigation_timeout_ms,
            ready_timeout_ms: browser.ready_timeout_ms,
            process_timeout: Duration::from_secs(browser.process_timeout_secs),
            export_button_selector: browser.export_button_selector.clone(),
            log_line_selector: browser.log_line_selector.clone(),
            status_selector: browser.status_selector.clone(),
            screenshot_dir: config.screenshot_dir(),
            installed: OnceCell::new(),
        })
    }

    /// Check that `npx playwright` resolves from the service checkout.
    pub async fn check_playwright_installed(&self) -> QaResult<()> {
        let status = Command::new("npx")
            .args(["--no-install", "playwright", "--version"])
            .current_dir(&self.work_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(QaError::PlaywrightNotFound),
        }
    }

    fn screenshot_path(&self, options: &InspectOptions) -> Option<String> {
        let dir = self.screenshot_dir.as_ref()?;
        let name = options.screenshot_name.as_ref()?;
        Some(dir.join(format!("{}.png", name)).to_string_lossy().into_owned())
    }

    /// Build the inspection script for `url`.
    pub fn build_script(&self, url: &str, options: &InspectOptions) -> QaResult<String> {
        let params = ScriptParams {
            url,
            export_button: &self.export_button_selector,
            log_lines: &self.log_line_selector,
            status: &self.status_selector,
            ready_tag: ui::RUNTIME_TAG,
            ready_message: ui::RUNTIME_READY_MESSAGE,
            quality_tag: ui::QUALITY_TAG,
            expect_quality: options.expect_quality,
            navigation_timeout_ms: self.navigation_timeout_ms,
            ready_timeout_ms: self.ready_timeout_ms,
            screenshot_path: self.screenshot_path(options),
        };
        let params = serde_json::to_string(&params)?;

        Ok(format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');

const params = {params};

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const page = await browser.newPage({{
    viewport: {{ width: {width}, height: {height} }}
  }});

  try {{
    await page.goto(params.url, {{ waitUntil: 'networkidle', timeout: params.navigationTimeoutMs }});

    let readyMarkerSeen = false;
    try {{
      await page.waitForFunction(
        (p) => {{
          const lines = Array.from(document.querySelectorAll(p.logLines)).map((el) => el.textContent || '');
          const ready = lines.some((line) => line.includes(p.readyTag) && line.includes(p.readyMessage));
          const quality = !p.expectQuality || lines.some((line) => line.includes(p.qualityTag));
          return ready && quality;
        }},
        params,
        {{ timeout: params.readyTimeoutMs }}
      );
      readyMarkerSeen = true;
    }} catch (_) {{
      // Not ready within the bound; report what the page shows.
    }}

    const button = page.locator(params.exportButton).first();
    const exportDisabled = (await button.count()) > 0 ? await button.isDisabled() : null;
    const logLines = await page.locator(params.logLines).allTextContents();
    const status = page.locator(params.status).first();
    const statusText = (await status.count()) > 0 ? await status.innerText() : '';

    if (params.screenshotPath) {{
      await page.screenshot({{ path: params.screenshotPath, fullPage: true }});
    }}

    console.log(JSON.stringify({{
      url: params.url,
      exportDisabled,
      statusText,
      logLines,
      readyMarkerSeen,
      screenshotPath: params.screenshotPath,
    }}));
  }} catch (error) {{
    console.error(JSON.stringify({{ error: error.message }}));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            params = params,
            browser = self.browser.as_str(),
            headless = self.headless,
            width = self.viewport_width,
            height = self.viewport_height,
        ))
    }

    /// Run a script with node and return its stdout.
    pub async fn run_script(&self, script: &str) -> QaResult<String> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("inspect.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let node_modules = std::fs::canonicalize(&self.work_dir)
            .unwrap_or_else(|_| self.work_dir.clone())
            .join("node_modules");

        let child = Command::new(&self.node_binary)
            .arg(&script_path)
            .current_dir(&self.work_dir)
            .env("NODE_PATH", node_modules)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.process_timeout, child)
            .await
            .map_err(|_| QaError::Timeout {
                operation: "browser inspection".to_string(),
                seconds: self.process_timeout.as_secs(),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(QaError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }
        Ok(stdout)
    }

    /// Parse the last JSON object line the script printed.
    pub fn parse_output(stdout: &str) -> QaResult<PageObservation> {
        stdout
            .lines()
            .rev()
            .map(str::trim)
            .filter(|line| line.starts_with('{'))
            .find_map(|line| serde_json::from_str::<PageObservation>(line).ok())
            .ok_or_else(|| QaError::Playwright(format!("no inspection result in output: {}", stdout.trim())))
    }
}

#[async_trait]
impl PageInspector for BrowserInspector {
    /// Load `url` and read the export control, status panel and log lines.
    async fn inspect(&self, url: &str, options: &InspectOptions) -> QaResult<PageObservation> {
        let installed = *self
            .installed
            .get_or_init(|| async { self.check_playwright_installed().await.is_ok() })
            .await;
        if !installed {
            return Err(QaError::PlaywrightNotFound);
        }

        if let Some(dir) = &self.screenshot_dir {
            std::fs::create_dir_all(dir)?;
        }

        let script = self.build_script(url, options)?;
        let stdout = self.run_script(&script).await?;
        let observation = Self::parse_output(&stdout)?;

        if !observation.runtime_ready() {
            warn!(url, "Runtime ready marker not observed");
        }
        info!(
            url,
            export_disabled = ?observation.export_disabled,
            log_lines = observation.log_lines.len(),
            "Inspected control page"
        );
        Ok(observation)
    }
}
