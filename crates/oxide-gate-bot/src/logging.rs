//! Logging setup with secret redaction.
//!
//! Every line written by the fmt layer passes through [`RedactionPatterns`]
//! so bot tokens, the MTProto API hash and phone numbers never reach stderr.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_FILTER: &str =
    "oxide_gate_core=info,oxide_gate_transport_telegram=info,oxide_gate_bot=info,teloxide=warn,grammers_client=warn,grammers_mtsender=warn,hyper=warn,reqwest=warn";

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
    api_hash1: Regex,
    api_hash2: Regex,
    phone: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            api_hash1: Regex::new(r"API_HASH=[^\s&]+")?,
            api_hash2: Regex::new(r#"api_hash(["']?\s*[:=]\s*["']?)[0-9a-fA-F]{32}"#)?,
            phone: Regex::new(r"\+([0-9]{1,3})[0-9]{5,}([0-9]{2})")?,
        })
    }

    /// Mask every secret in `input`
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .api_hash1
            .replace_all(&output, "API_HASH=[MASKED]")
            .to_string();
        output = self
            .api_hash2
            .replace_all(&output, "api_hash$1[MASKED]")
            .to_string();
        output = self.phone.replace_all(&output, "+$1***$2").to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // The caller's buffer counts as fully written even if the redacted
        // text has a different length.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

/// Install the global subscriber. `DEBUG_MODE=true` switches to `debug`
/// unless `RUST_LOG` is set.
pub fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}
