//! Scripted in-memory portal for tests.
//!
//! [`FakeDriver`] models the handful of page behaviours the engine depends
//! on: elements that are present, text they hold, clicks that change the
//! page, and a sequence of grid pages reached through the next-page arrow.

use crate::browser::{Driver, Launcher, TABLE_SNAPSHOT_SCRIPT};
use crate::error::{DriverError, HarvestError};
use crate::locator::{Condition, Locator};
use crate::targets;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, MutexGuard};

/// What a click on a scripted element does.
#[derive(Debug, Clone)]
pub enum Effect {
    Navigate(String),
    Show(Locator),
    Hide(Locator),
    SetText(Locator, String),
    ClearText(Locator),
    /// Move to the next scripted grid page.
    NextPage,
    /// The click itself fails.
    Fail(DriverError),
}

/// One grid page: its tables, texts and page-local click behaviour.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    tables: Vec<Value>,
    snapshot_error: Option<String>,
    visible: Vec<Locator>,
    texts: Vec<(Locator, String)>,
    effects: Vec<(Locator, Effect)>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pagination status reading "Pagina `current` di `total`".
    pub fn cursor(self, current: u32, total: u32) -> Self {
        self.status(format!("Pagina {current} di {total}"))
    }

    pub fn status(self, text: impl Into<String>) -> Self {
        self.text(first_locator(&targets::pagination_status()), text)
    }

    /// A `tbody` table with the given cell rows.
    pub fn table(mut self, rows: Vec<Vec<&str>>) -> Self {
        self.tables.push(json!({ "hasBody": true, "rows": rows }));
        self
    }

    pub fn raw_table(mut self, value: Value) -> Self {
        self.tables.push(value);
        self
    }

    /// The whole-page table snapshot fails with a script error.
    pub fn snapshot_error(mut self, message: impl Into<String>) -> Self {
        self.snapshot_error = Some(message.into());
        self
    }

    pub fn show(mut self, locator: Locator) -> Self {
        self.visible.push(locator);
        self
    }

    pub fn text(mut self, locator: Locator, text: impl Into<String>) -> Self {
        self.texts.retain(|(l, _)| *l != locator);
        self.texts.push((locator, text.into()));
        self
    }

    pub fn on_click(mut self, locator: Locator, effect: Effect) -> Self {
        self.effects.push((locator, effect));
        self
    }

    /// Show the next-page arrow; clicking it moves to the following page.
    pub fn advancing(self) -> Self {
        let arrow = first_locator(&targets::next_page());
        self.show(arrow.clone()).on_click(arrow, Effect::NextPage)
    }

    /// Row `row` (1-based) opens a detail dialog holding `value`.
    pub fn detail(mut self, row: usize, value: &str) -> Self {
        let open = first_locator(&targets::row_detail_open().at_row(row));
        let dialog = first_locator(&targets::detail_value());
        let close = first_locator(&targets::detail_close());
        if !self.visible.contains(&close) {
            self = self
                .show(close.clone())
                .on_click(close, Effect::ClearText(dialog.clone()));
        }
        self.show(open.clone())
            .on_click(open, Effect::SetText(dialog, value.to_string()))
    }
}

fn first_locator(target: &crate::locator::Target) -> Locator {
    target.locators[0].clone()
}

struct State {
    url: String,
    visible: Vec<Locator>,
    texts: Vec<(Locator, String)>,
    effects: Vec<(Locator, Effect)>,
    pages: Vec<FakePage>,
    page: usize,
    goto_error: Option<DriverError>,
    goto_redirect: Option<String>,
    goto_navigates: bool,
    script_navigates: bool,
    address_bar_navigates: bool,
    script_errors: Vec<(String, DriverError)>,
    clicks: Vec<Locator>,
    fills: Vec<(Locator, String)>,
    scripts: Vec<String>,
    typed: Vec<String>,
    gotos: Vec<String>,
    releases: usize,
    closed: bool,
}

impl State {
    fn current(&self) -> Option<&FakePage> {
        self.pages.get(self.page)
    }

    fn text_of(&self, locator: &Locator) -> Option<&str> {
        let local = self
            .current()
            .and_then(|p| p.texts.iter().find(|(l, _)| l == locator));
        local
            .or_else(|| self.texts.iter().find(|(l, _)| l == locator))
            .map(|(_, t)| t.as_str())
    }

    fn is_present(&self, locator: &Locator) -> bool {
        self.visible.contains(locator)
            || self.text_of(locator).is_some()
            || self
                .current()
                .is_some_and(|p| p.visible.contains(locator))
    }

    fn effects_for(&self, locator: &Locator) -> Vec<Effect> {
        let local = self.current().map(|p| p.effects.as_slice()).unwrap_or(&[]);
        local
            .iter()
            .chain(self.effects.iter())
            .filter(|(l, _)| l == locator)
            .map(|(_, e)| e.clone())
            .collect()
    }

    fn apply(&mut self, effect: Effect) -> Result<(), DriverError> {
        match effect {
            Effect::Navigate(url) => self.url = url,
            Effect::Show(locator) => self.visible.push(locator),
            Effect::Hide(locator) => self.visible.retain(|l| *l != locator),
            Effect::SetText(locator, text) => {
                self.texts.retain(|(l, _)| *l != locator);
                self.texts.push((locator, text));
            }
            Effect::ClearText(locator) => self.texts.retain(|(l, _)| *l != locator),
            Effect::NextPage => {
                if self.page + 1 < self.pages.len() {
                    self.page += 1;
                }
            }
            Effect::Fail(error) => return Err(error),
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }
}

/// In-memory [`Driver`] whose page behaviour is scripted up front.
pub struct FakeDriver {
    state: Mutex<State>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                url: "about:blank".to_string(),
                visible: Vec::new(),
                texts: Vec::new(),
                effects: Vec::new(),
                pages: Vec::new(),
                page: 0,
                goto_error: None,
                goto_redirect: None,
                goto_navigates: true,
                script_navigates: true,
                address_bar_navigates: true,
                script_errors: Vec::new(),
                clicks: Vec::new(),
                fills: Vec::new(),
                scripts: Vec::new(),
                typed: Vec::new(),
                gotos: Vec::new(),
                releases: 0,
                closed: false,
            }),
        }
    }

    /// A portal whose login form lands on `dashboard_url` when submitted.
    pub fn with_login(dashboard_url: &str) -> Self {
        let driver = Self::new();
        let submit = first_locator(&targets::login_submit());
        driver.show(&first_locator(&targets::email_field()));
        driver.show(&first_locator(&targets::password_field()));
        driver.show(&submit);
        driver.on_click(&submit, Effect::Navigate(dashboard_url.to_string()));
        driver
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_url(&self, url: &str) {
        self.state().url = url.to_string();
    }

    pub fn show(&self, locator: &Locator) {
        self.state().visible.push(locator.clone());
    }

    pub fn hide(&self, locator: &Locator) {
        self.state().visible.retain(|l| l != locator);
    }

    pub fn set_text(&self, locator: &Locator, text: &str) {
        let mut state = self.state();
        state.texts.retain(|(l, _)| l != locator);
        state.texts.push((locator.clone(), text.to_string()));
    }

    pub fn on_click(&self, locator: &Locator, effect: Effect) {
        self.state().effects.push((locator.clone(), effect));
    }

    pub fn push_page(&self, page: FakePage) {
        self.state().pages.push(page);
    }

    pub fn fail_goto(&self, error: DriverError) {
        self.state().goto_error = Some(error);
    }

    /// Direct navigation lands on `url` whatever was requested.
    pub fn redirect_goto(&self, url: &str) {
        self.state().goto_redirect = Some(url.to_string());
    }

    /// Whether each navigation strategy actually changes the location.
    pub fn navigation(&self, direct: bool, script: bool, address_bar: bool) {
        let mut state = self.state();
        state.goto_navigates = direct;
        state.script_navigates = script;
        state.address_bar_navigates = address_bar;
    }

    /// Scripts containing `needle` fail with `error`.
    pub fn fail_script(&self, needle: &str, error: DriverError) {
        self.state().script_errors.push((needle.to_string(), error));
    }

    pub fn url(&self) -> String {
        self.state().url.clone()
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.state().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(Locator, String)> {
        self.state().fills.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state().scripts.clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.state().typed.clone()
    }

    pub fn gotos(&self) -> Vec<String> {
        self.state().gotos.clone()
    }

    pub fn releases(&self) -> usize {
        self.state().releases
    }

    /// Index of the grid page currently shown.
    pub fn current_page(&self) -> usize {
        self.state().page
    }
}

/// Target of a `window.location.href = "<url>";` script.
fn scripted_location(script: &str) -> Option<String> {
    let rest = script.trim().strip_prefix("window.location.href")?;
    let literal = rest.trim_start().strip_prefix('=')?.trim().trim_end_matches(';');
    serde_json::from_str(literal).ok()
}

#[async_trait]
impl Driver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        state.ensure_open()?;
        state.gotos.push(url.to_string());
        if let Some(error) = state.goto_error.clone() {
            return Err(error);
        }
        if state.goto_navigates {
            state.url = state.goto_redirect.clone().unwrap_or_else(|| url.to_string());
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let state = self.state();
        state.ensure_open()?;
        Ok(state.url.clone())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        let mut state = self.state();
        state.ensure_open()?;
        state.scripts.push(script.to_string());
        if let Some((_, error)) = state.script_errors.iter().find(|(n, _)| script.contains(n.as_str())) {
            return Err(error.clone());
        }

        if script == TABLE_SNAPSHOT_SCRIPT {
            return match state.current() {
                Some(FakePage {
                    snapshot_error: Some(message),
                    ..
                }) => Err(DriverError::Script(message.clone())),
                Some(page) => Ok(Value::Array(page.tables.clone())),
                None => Ok(Value::Array(Vec::new())),
            };
        }

        if let Some(url) = scripted_location(script) {
            if state.script_navigates {
                state.url = url;
            }
        }
        Ok(Value::Null)
    }

    async fn check(&self, locator: &Locator, _condition: Condition) -> Result<bool, DriverError> {
        let state = self.state();
        state.ensure_open()?;
        Ok(state.is_present(locator))
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        let mut state = self.state();
        state.ensure_open()?;
        if !state.is_present(locator) {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        for effect in state.effects_for(locator) {
            state.apply(effect)?;
        }
        state.clicks.push(locator.clone());
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        state.ensure_open()?;
        if !state.is_present(locator) {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        state.fills.push((locator.clone(), text.to_string()));
        Ok(())
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        let state = self.state();
        state.ensure_open()?;
        if !state.is_present(locator) {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        Ok(state
            .text_of(locator)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }

    async fn type_into_page(&self, keys: &str) -> Result<(), DriverError> {
        let mut state = self.state();
        state.ensure_open()?;
        state.typed.push(keys.to_string());
        if state.address_bar_navigates {
            state.url = keys.to_string();
        }
        Ok(())
    }

    async fn release(&self) -> Result<(), DriverError> {
        let mut state = self.state();
        state.releases += 1;
        state.ensure_open()?;
        state.closed = true;
        Ok(())
    }
}

/// Hands out one shared [`FakeDriver`], or fails to start.
pub struct FakeLauncher {
    driver: Arc<FakeDriver>,
    failure: Option<String>,
}

impl FakeLauncher {
    pub fn new(driver: Arc<FakeDriver>) -> Self {
        Self {
            driver,
            failure: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            driver: Arc::new(FakeDriver::new()),
            failure: Some(reason.to_string()),
        }
    }

    pub fn driver(&self) -> &Arc<FakeDriver> {
        &self.driver
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    type Driver = Arc<FakeDriver>;

    async fn launch(&self) -> Result<Self::Driver, HarvestError> {
        match &self.failure {
            Some(reason) => Err(HarvestError::SessionStart(reason.clone())),
            None => Ok(Arc::clone(&self.driver)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scripted_location() {
        assert_eq!(
            scripted_location("window.location.href = \"https://a.example/x\";").as_deref(),
            Some("https://a.example/x")
        );
        assert_eq!(scripted_location("document.title"), None);
    }

    #[tokio::test]
    async fn next_page_effect_walks_pages() {
        let driver = FakeDriver::new();
        driver.push_page(FakePage::new().cursor(1, 2).advancing());
        driver.push_page(FakePage::new().cursor(2, 2));

        let arrow = first_locator(&targets::next_page());
        driver.click(&arrow).await.unwrap();
        assert_eq!(driver.current_page(), 1);
        assert!(driver.click(&arrow).await.is_err());
    }

    #[tokio::test]
    async fn second_release_reports_closed() {
        let driver = FakeDriver::new();
        driver.release().await.unwrap();
        assert_eq!(driver.release().await, Err(DriverError::Closed));
        assert_eq!(driver.releases(), 2);
    }
}
