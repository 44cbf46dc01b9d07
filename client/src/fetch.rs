use std::sync::atomic::{AtomicU64, Ordering};

use gloo_timers::callback::Timeout;
use serde_json::Value;

use crowdmap_shared::{ApiContract, IngestError, NetworkFailure};

/// Sequencer generations. Process-wide so a remounted session never
/// accepts a ticket issued by the one it replaced.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Identifies one issued fetch. Within a generation tickets increase
/// monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket {
    generation: u64,
    seq: u64,
}

impl FetchTicket {
    pub const fn seq(self) -> u64 {
        self.seq
    }
}

/// Only the most recently issued fetch may apply its result, and nothing
/// applies once the session has been torn down.
#[derive(Debug)]
pub struct FetchSequencer {
    generation: u64,
    latest: u64,
    closed: bool,
}

impl Default for FetchSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            latest: 0,
            closed: false,
        }
    }

    pub fn begin(&mut self) -> FetchTicket {
        self.latest = self.latest.wrapping_add(1);
        FetchTicket {
            generation: self.generation,
            seq: self.latest,
        }
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        !self.closed && ticket.generation == self.generation && ticket.seq == self.latest
    }

    #[cfg(test)]
    pub const fn latest(&self) -> u64 {
        self.latest
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

pub fn endpoint_url(api_base: &str, contract: ApiContract) -> String {
    format!("{}{}", api_base.trim_end_matches('/'), contract.path())
}

fn classify_send_error(err: gloo_net::Error) -> IngestError {
    match err {
        // fetch() rejects with a TypeError for network/CORS failures and an
        // AbortError when our timeout fires; both mean nothing came back.
        gloo_net::Error::JsError(e) => NetworkFailure::NoResponse(e.to_string()).into(),
        other => NetworkFailure::NotSent(other.to_string()).into(),
    }
}

/// GET `url` and decode the body as JSON, aborting after `timeout_ms`.
pub async fn fetch_payload(url: &str, timeout_ms: u32) -> Result<Value, IngestError> {
    let controller = web_sys::AbortController::new()
        .map_err(|e| NetworkFailure::NotSent(format!("abort controller: {e:?}")))?;
    let signal = controller.signal();
    let abort = controller.clone();
    // Dropped on return, which cancels it.
    let _deadline = Timeout::new(timeout_ms, move || abort.abort());

    let resp = gloo_net::http::Request::get(url)
        .abort_signal(Some(&signal))
        .send()
        .await
        .map_err(classify_send_error)?;

    if !resp.ok() {
        return Err(NetworkFailure::Status(resp.status()).into());
    }

    resp.json::<Value>()
        .await
        .map_err(|e| IngestError::MalformedPayload(format!("parse error: {e}")))
}
