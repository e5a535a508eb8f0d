use std::sync::LazyLock;

use regex::Regex;
use tracing_subscriber::fmt::MakeWriter;

/// A writer that redacts provider API keys from log output.
pub struct RedactingWriter<W> {
    inner: W,
}

impl RedactingWriter<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self {
            inner: std::io::stderr(),
        }
    }
}

impl<W: std::io::Write> RedactingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: std::io::Write> std::io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let original = String::from_utf8_lossy(buf);
        let redacted = redact_secrets(&original);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<'a> MakeWriter<'a> for RedactingWriter<std::io::Stderr> {
    type Writer = RedactingWriter<std::io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::stderr()
    }
}

static PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
          sk-ant-[A-Za-z0-9_\-]{10,}   # Anthropic API keys
        | sk-[A-Za-z0-9_\-]{20,}       # OpenAI keys
        | AIza[A-Za-z0-9_\-]{20,}      # Google API keys
        ",
    )
    .expect("redaction regex should compile")
});

/// Replace known API key patterns with `[REDACTED]`.
pub fn redact_secrets(input: &str) -> String {
    PATTERNS.replace_all(input, "[REDACTED]").into_owned()
}
