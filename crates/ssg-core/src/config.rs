use std::{env, fmt, fs, path::Path, time::Duration};

use crate::{
    chat::correlator::{WaitPolicy, DEFAULT_IN_PROGRESS_SUFFIX},
    domain::AccountId,
    errors::Error,
    Result,
};

/// Typed configuration, read from the environment (plus an optional `.env`).
#[derive(Clone)]
pub struct Config {
    // Slack
    pub slack_user_token: String,
    pub bot_user_id: String,
    pub slack_api_base: String,
    pub slack_http_timeout: Duration,

    // Reply polling
    pub poll_interval: Duration,
    pub reply_timeout: Option<Duration>,
    pub poll_max_failures: u32,
    pub typing_suffix: String,

    // Web
    pub model_label: String,
    pub bind_addr: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let str_or = |key: &str, default: &str| {
            get(key)
                .and_then(non_empty)
                .unwrap_or_else(|| default.to_string())
        };
        let u64_of = |key: &str| get(key).and_then(|s| s.trim().parse::<u64>().ok());

        // Required secrets
        let slack_user_token = get("SLACK_USER_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("SLACK_USER_TOKEN environment variable is required".to_string())
        })?;
        let bot_user_id = get("BOT_USER_ID").and_then(non_empty).ok_or_else(|| {
            Error::Config("BOT_USER_ID environment variable is required".to_string())
        })?;

        let slack_api_base = str_or("SLACK_API_BASE", "https://slack.com/api")
            .trim_end_matches('/')
            .to_string();
        let slack_http_timeout =
            Duration::from_millis(u64_of("SLACK_HTTP_TIMEOUT_MS").unwrap_or(10_000));

        let poll_interval = Duration::from_millis(u64_of("POLL_INTERVAL_MS").unwrap_or(5_000));
        if poll_interval.is_zero() {
            return Err(Error::Config(
                "POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }

        // 0 disables the deadline.
        let reply_timeout = match u64_of("REPLY_TIMEOUT_MS").unwrap_or(600_000) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        let poll_max_failures = u64_of("POLL_MAX_FAILURES")
            .map(|n| n.clamp(1, u32::MAX as u64) as u32)
            .unwrap_or(3);
        let typing_suffix = get("TYPING_SUFFIX").unwrap_or_else(|| DEFAULT_IN_PROGRESS_SUFFIX.to_string());

        let model_label = str_or("MODEL_LABEL", "claude_2");
        let bind_addr = match get("BIND_ADDR").and_then(non_empty) {
            Some(addr) => addr,
            None => format!("0.0.0.0:{}", u64_of("PORT").unwrap_or(8000)),
        };

        Ok(Self {
            slack_user_token,
            bot_user_id,
            slack_api_base,
            slack_http_timeout,
            poll_interval,
            reply_timeout,
            poll_max_failures,
            typing_suffix,
            model_label,
            bind_addr,
        })
    }

    pub fn responder(&self) -> AccountId {
        AccountId(self.bot_user_id.clone())
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            responder: self.responder(),
            poll_interval: self.poll_interval,
            timeout: self.reply_timeout,
            max_fetch_failures: self.poll_max_failures,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("slack_user_token", &"<redacted>")
            .field("bot_user_id", &self.bot_user_id)
            .field("slack_api_base", &self.slack_api_base)
            .field("slack_http_timeout", &self.slack_http_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("reply_timeout", &self.reply_timeout)
            .field("poll_max_failures", &self.poll_max_failures)
            .field("typing_suffix", &self.typing_suffix)
            .field("model_label", &self.model_label)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
