#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

use std::collections::HashMap;
use std::time::Duration;

use webpac_scraper::{Config, PatronAttributes, RetryPolicy, Session, SessionTransport};
use wiremock::MockServer;

pub const CARD: &str = "21234000123456";
pub const PNUM: &str = "1234567";

/// Config pointing at `host` with no pauses between workflow steps
pub fn test_config(host: &str) -> Config {
    let mut config = Config::default();
    config.server.host = host.to_string();
    config.server.secure_sessions = false;
    config.network.retry_delay_ms = 0;
    config.network.timeout_seconds = 2;
    config.workflow.race_delay_ms = 0;
    config.workflow.payment_settle_ms = 0;
    config
}

/// Config pointing at a running mock server
pub fn server_config(server: &MockServer) -> Config {
    let address = server.address();
    let mut config = test_config(&address.ip().to_string());
    config.server.port = address.port();
    config.server.ssl_port = address.port();
    config
}

pub fn test_patron() -> PatronAttributes {
    let fields: HashMap<String, String> = [
        ("RECORDNUM", PNUM),
        ("PBARCODE", CARD),
        ("PATRNNAME", "Doe, Jane"),
        ("PTYPE", "3"),
        ("MONEYOWED", "$12.50"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    PatronAttributes::from_fields(&fields).expect("fixture patron has a record number")
}

/// Session with a real HTTP transport against `server`, patron already loaded
pub fn http_session(server: &MockServer) -> Session {
    let config = server_config(server);
    let transport = SessionTransport::http(&config, server.uri()).unwrap();
    let mut session = Session::with_transport(&config, CARD, transport)
        .unwrap()
        .with_pin(Some("1234"));
    session.set_patron(test_patron());
    session
}

/// Session replaying `pages` in order, with every request recorded
pub fn scripted_session(config: &Config, pages: &[&str]) -> (Session, mocks::RequestLog) {
    let backend = mocks::ScriptedBackend::pages(pages);
    let requests = backend.requests();
    let transport = SessionTransport::new(
        Box::new(backend),
        "http://catalog.example.org/",
        RetryPolicy::immediate(3),
        Duration::from_secs(2),
    );
    let mut session = Session::with_transport(config, CARD, transport)
        .unwrap()
        .with_pin(Some("1234"));
    session.set_patron(test_patron());
    (session, requests)
}

pub fn form_value<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
    form.iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}
