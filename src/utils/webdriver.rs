//! Minimal blocking client for the W3C WebDriver protocol, plus the chromedriver
//! extension for raw DevTools commands.

use std::{
    thread::sleep,
    time::{Duration, Instant},
};

use anyhow::{anyhow, bail, Context};
use serde_json::{json, Value};

/// The key W3C drivers use for element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

pub struct WebDriver {
    agent: ureq::Agent,
    base: String,
    session: String,
}

fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(2))
        .timeout_read(Duration::from_secs(60))
        .build()
}

/// Polls `/status` until the driver says it accepts sessions.
pub fn wait_until_ready(base: &str, timeout: Duration) -> anyhow::Result<()> {
    let agent = agent();
    let url = format!("{}/status", base.trim_end_matches('/'));
    let start = Instant::now();

    loop {
        let ready = agent
            .get(&url)
            .call()
            .ok()
            .and_then(|r| r.into_string().ok())
            .and_then(|body| parse_value(&body).ok())
            .map(|v| v["ready"].as_bool().unwrap_or(false))
            .unwrap_or(false);
        if ready {
            return Ok(());
        }
        if start.elapsed() > timeout {
            bail!("webdriver at {} did not become ready within {:?}", base, timeout);
        }
        sleep(Duration::from_millis(250));
    }
}

/// Unwraps the `value` member of a driver response, turning protocol errors into `Err`.
fn parse_value(body: &str) -> anyhow::Result<Value> {
    let mut parsed: Value = serde_json::from_str(body).context("webdriver sent invalid JSON")?;
    let value = parsed
        .get_mut("value")
        .map(Value::take)
        .ok_or_else(|| anyhow!("webdriver response without a value: {}", body))?;

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value.get("message").and_then(Value::as_str).unwrap_or("");
        bail!("{}: {}", error, message);
    }
    Ok(value)
}

fn element_id(value: &Value) -> anyhow::Result<ElementId> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|s| ElementId(s.to_owned()))
        .ok_or_else(|| anyhow!("not an element reference: {}", value))
}

fn element_ids(value: &Value) -> anyhow::Result<Vec<ElementId>> {
    value
        .as_array()
        .ok_or_else(|| anyhow!("expected a list of elements, got {}", value))?
        .iter()
        .map(element_id)
        .collect()
}

impl WebDriver {
    pub fn new_session(base: &str, capabilities: Value) -> anyhow::Result<WebDriver> {
        let mut driver = WebDriver {
            agent: agent(),
            base: base.trim_end_matches('/').to_owned(),
            session: String::new(),
        };

        let value = driver
            .request("POST", "/session", Some(&json!({ "capabilities": capabilities })))
            .context("failed to create a browser session")?;
        driver.session = value["sessionId"]
            .as_str()
            .ok_or_else(|| anyhow!("session response without an id: {}", value))?
            .to_owned();
        info!("browser session {} started", driver.session);

        Ok(driver)
    }

    fn request(&self, method: &str, path: &str, body: Option<&Value>) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.base, path);
        debug!("webdriver {} {}", method, path);

        let req = self.agent.request(method, &url);
        let res = match body {
            Some(body) => req
                .set("content-type", "application/json")
                .send_string(&body.to_string()),
            None => req.call(),
        };

        let resp = match res {
            Ok(resp) => resp,
            // error statuses still carry a protocol error body worth reading
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(ureq::Error::Transport(err)) => bail!("{} {} failed: {}", method, url, err),
        };
        let text = resp.into_string().context("failed to read webdriver response")?;
        parse_value(&text).with_context(|| format!("{} {}", method, path))
    }

    fn session_command(&self, method: &str, path: &str, body: Option<&Value>) -> anyhow::Result<Value> {
        self.request(method, &format!("/session/{}{}", self.session, path), body)
    }

    pub fn navigate(&self, url: &str) -> anyhow::Result<()> {
        self.session_command("POST", "/url", Some(&json!({ "url": url })))?;
        Ok(())
    }

    pub fn set_window_size(&self, width: u32, height: u32) -> anyhow::Result<()> {
        self.session_command("POST", "/window/rect", Some(&json!({ "width": width, "height": height })))?;
        Ok(())
    }

    pub fn execute(&self, script: &str) -> anyhow::Result<Value> {
        self.session_command("POST", "/execute/sync", Some(&json!({ "script": script, "args": [] })))
    }

    pub fn find_elements(&self, css: &str) -> anyhow::Result<Vec<ElementId>> {
        let value = self.session_command(
            "POST",
            "/elements",
            Some(&json!({ "using": "css selector", "value": css })),
        )?;
        element_ids(&value)
    }

    pub fn find_element(&self, css: &str) -> anyhow::Result<ElementId> {
        let value = self.session_command(
            "POST",
            "/element",
            Some(&json!({ "using": "css selector", "value": css })),
        )?;
        element_id(&value)
    }

    /// DOM property, e.g. `href` resolved to an absolute URL.
    pub fn property(&self, el: &ElementId, name: &str) -> anyhow::Result<Option<String>> {
        let value = self.session_command("GET", &format!("/element/{}/property/{}", el.0, name), None)?;
        Ok(value.as_str().map(str::to_owned))
    }

    pub fn click(&self, el: &ElementId) -> anyhow::Result<()> {
        self.session_command("POST", &format!("/element/{}/click", el.0), Some(&json!({})))?;
        Ok(())
    }

    /// Chrome DevTools command through chromedriver.
    pub fn cdp(&self, cmd: &str, params: Value) -> anyhow::Result<Value> {
        self.session_command("POST", "/goog/cdp/execute", Some(&json!({ "cmd": cmd, "params": params })))
    }

    pub fn quit(self) -> anyhow::Result<()> {
        self.session_command("DELETE", "", None)?;
        info!("browser session {} closed", self.session);
        Ok(())
    }
}
