//! Remote client: HTTP transport plus API pacing.
//!
//! [`Fetch`] is the transport seam. [`HttpFetcher`] is the real `ureq`
//! implementation; tests substitute canned responses. [`RemoteClient`] wraps
//! a fetcher with the [`RateLimiter`] so that every API call is paced while
//! raw file downloads are not.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;

use pooldl_core::{Config, Credentials};

use crate::error::FetchError;
use crate::rate_limit::{Clock, RateLimiter, SystemClock};

/// Minimum spacing between two progress reports.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Receives `(bytes_total, bytes_transferred)` while a body downloads.
///
/// `bytes_total` is `0` when the server sent no `Content-Length`. A failing
/// sink never aborts the transfer.
pub trait ProgressSink {
    fn report(&mut self, total: u64, transferred: u64) -> io::Result<()>;
}

impl<F> ProgressSink for F
where
    F: FnMut(u64, u64) -> io::Result<()>,
{
    fn report(&mut self, total: u64, transferred: u64) -> io::Result<()> {
        self(total, transferred)
    }
}

/// Rate-limits calls into a [`ProgressSink`] and swallows its errors.
struct ThrottledProgress<'a> {
    sink: &'a mut dyn ProgressSink,
    interval: Duration,
    last: Option<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    fn new(sink: &'a mut dyn ProgressSink, interval: Duration) -> Self {
        Self {
            sink,
            interval,
            last: None,
        }
    }

    fn tick(&mut self, total: u64, transferred: u64) {
        let now = Instant::now();
        if self
            .last
            .is_some_and(|last| now.duration_since(last) < self.interval)
        {
            return;
        }
        self.last = Some(now);
        self.emit(total, transferred);
    }

    fn finish(&mut self, total: u64, transferred: u64) {
        self.emit(total, transferred);
    }

    fn emit(&mut self, total: u64, transferred: u64) {
        if let Err(e) = self.sink.report(total, transferred) {
            tracing::debug!("progress sink failed (ignored): {e}");
        }
    }
}

/// Read `reader` to the end, reporting progress along the way.
pub(crate) fn read_body(
    url: &str,
    mut reader: impl Read,
    total: u64,
    progress: Option<&mut dyn ProgressSink>,
) -> Result<Vec<u8>, FetchError> {
    let body_err = |source| FetchError::Body {
        url: url.to_string(),
        source,
    };
    let mut progress = progress.map(|sink| ThrottledProgress::new(sink, PROGRESS_INTERVAL));
    let mut body = Vec::with_capacity(usize::try_from(total).unwrap_or(0).min(64 << 20));
    let mut buf = vec![0u8; READ_CHUNK];

    if let Some(p) = progress.as_mut() {
        p.tick(total, 0);
    }
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(body_err(e)),
        };
        body.extend_from_slice(&buf[..n]);
        if let Some(p) = progress.as_mut() {
            p.tick(total, body.len() as u64);
        }
    }
    if let Some(p) = progress.as_mut() {
        p.finish(total.max(body.len() as u64), body.len() as u64);
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Fetch a URL's body.
pub trait Fetch {
    /// GET `url`. With `authenticate`, attach credentials if configured.
    fn fetch(
        &mut self,
        url: &str,
        progress: Option<&mut dyn ProgressSink>,
        authenticate: bool,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Blocking `ureq` transport.
///
/// Certificate-chain verification is disabled: the operator accepted this
/// for the hosting API and its CDN.
pub struct HttpFetcher {
    agent: ureq::Agent,
    credentials: Option<Credentials>,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl HttpFetcher {
    pub fn new(
        user_agent: &str,
        connect_timeout: Duration,
        timeout: Duration,
        credentials: Option<Credentials>,
    ) -> Result<Self, FetchError> {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        let agent = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .timeout_connect(connect_timeout)
            .timeout(timeout)
            .tls_connector(Arc::new(tls))
            .build();
        Ok(Self { agent, credentials })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(
            &config.user_agent,
            config.connect_timeout(),
            config.timeout(),
            config.credentials(),
        )
    }
}

fn basic_auth(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.login, credentials.api_key);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(raw)
    )
}

impl Fetch for HttpFetcher {
    fn fetch(
        &mut self,
        url: &str,
        progress: Option<&mut dyn ProgressSink>,
        authenticate: bool,
    ) -> Result<Vec<u8>, FetchError> {
        let mut request = self.agent.get(url);
        if authenticate {
            if let Some(credentials) = &self.credentials {
                request = request.set("Authorization", &basic_auth(credentials));
            }
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    message: t.to_string(),
                });
            }
        };

        let total = response
            .header("Content-Length")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        tracing::debug!("GET {url} -> {} ({total} bytes)", response.status());
        read_body(url, response.into_reader(), total, progress)
    }
}

// ---------------------------------------------------------------------------
// RemoteClient
// ---------------------------------------------------------------------------

/// A fetcher plus the run's rate-limit state.
#[derive(Debug)]
pub struct RemoteClient<F: Fetch, C: Clock = SystemClock> {
    fetcher: F,
    limiter: RateLimiter<C>,
}

impl<F: Fetch> RemoteClient<F, SystemClock> {
    pub fn new(fetcher: F) -> Self {
        Self::with_clock(fetcher, SystemClock)
    }
}

impl<F: Fetch, C: Clock> RemoteClient<F, C> {
    pub fn with_clock(fetcher: F, clock: C) -> Self {
        Self {
            fetcher,
            limiter: RateLimiter::new(clock),
        }
    }

    /// Paced API call. The timestamp is recorded even if the call fails.
    pub fn api_get(&mut self, url: &str, authenticate: bool) -> Result<Vec<u8>, FetchError> {
        self.limiter.pace();
        let result = self.fetcher.fetch(url, None, authenticate);
        self.limiter.record();
        result
    }

    /// Unpaced file download, authenticated when credentials exist.
    pub fn download(
        &mut self,
        url: &str,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<Vec<u8>, FetchError> {
        self.fetcher.fetch(url, progress, true)
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }
}
