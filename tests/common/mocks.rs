use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use webpac_scraper::{Backend, RawResponse, Result, ScrapeError};

/// Every request seen by a [`ScriptedBackend`]: URL and POST form, if any
pub type RequestLog = Arc<Mutex<Vec<(String, Option<Vec<(String, String)>>)>>>;

/// Backend that replays canned outcomes in order, then empty bodies.
#[derive(Default)]
pub struct ScriptedBackend {
    outcomes: Mutex<VecDeque<Result<RawResponse>>>,
    requests: RequestLog,
}

impl ScriptedBackend {
    pub fn new(outcomes: Vec<Result<RawResponse>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: RequestLog::default(),
        }
    }

    pub fn pages(pages: &[&str]) -> Self {
        Self::new(pages.iter().map(|page| Ok(page_response(page))).collect())
    }

    pub fn requests(&self) -> RequestLog {
        Arc::clone(&self.requests)
    }
}

pub fn page_response(body: &str) -> RawResponse {
    RawResponse {
        code: 200,
        body: body.to_string(),
        ..RawResponse::default()
    }
}

pub fn io_failure() -> ScrapeError {
    ScrapeError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    ))
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn send(
        &self,
        url: &str,
        form: Option<&[(String, String)]>,
        _timeout: Duration,
    ) -> Result<RawResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), form.map(<[_]>::to_vec)));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RawResponse::default()))
    }
}
