//! HTTP poller
//!
//! The worker behind one job. On every tick it requests each configured url
//! in order and logs the outcome at the job's success or error severity.
//! A url that fails is retried a few times with backoff, then left until the
//! next tick so the urls after it still get polled. The job's retry policy
//! bounds the consecutive failures the worker tolerates before it exits.

use httpdir_core::{JobSpec, Severity};
use reqwest::{Method, RequestBuilder};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Requests made for one url within a single tick
const MAX_ATTEMPTS_PER_TICK: u32 = 3;

/// What happened to one url during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollOutcome {
    Responded,
    GaveUp,
    Exit,
}

/// Periodically polls the endpoints of one job
pub struct HttpPoller {
    spec: JobSpec,
    client: reqwest::Client,
}

impl HttpPoller {
    pub fn new(spec: JobSpec, client: reqwest::Client) -> Self {
        Self { spec, client }
    }

    /// Starts the polling loop
    ///
    /// Returns only when the retry policy is exhausted and the job is allowed
    /// to exit on its own.
    pub async fn run(self) {
        let name = &self.spec.name;
        info!(
            "Starting poller '{}' (interval: {:?})",
            name,
            self.spec.config.interval()
        );

        let mut ticker = time::interval(self.spec.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0;

        loop {
            ticker.tick().await;

            for url in &self.spec.config.urls {
                match self.poll_with_retries(url, &mut failures).await {
                    PollOutcome::Exit => {
                        warn!("Poller '{}' exiting after exhausting retries", name);
                        return;
                    }
                    PollOutcome::GaveUp => {
                        debug!("Poller '{}' gave up on {} until next tick", name, url)
                    }
                    PollOutcome::Responded => {}
                }
            }
        }
    }

    /// Requests one url, retrying transport errors a bounded number of times
    ///
    /// `failures` counts consecutive transport failures across ticks and is
    /// reset by any response.
    async fn poll_with_retries(&self, url: &str, failures: &mut u32) -> PollOutcome {
        let config = &self.spec.config;
        let retries = self.spec.common.retries;

        for attempt in 0..MAX_ATTEMPTS_PER_TICK {
            match self.request(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    let severity = if status.is_success() {
                        config.success_severity
                    } else {
                        config.error_severity
                    };
                    emit(
                        severity,
                        &self.spec.name,
                        &format!("{} {} -> {}", config.method, url, status),
                    );
                    *failures = 0;
                    return PollOutcome::Responded;
                }
                Err(e) => {
                    emit(
                        config.error_severity,
                        &self.spec.name,
                        &format!("{} {} failed: {}", config.method, url, e),
                    );

                    if retries.exhausted(*failures) {
                        if self.spec.common.can_exit() {
                            return PollOutcome::Exit;
                        }
                        *failures = 0;
                        return PollOutcome::GaveUp;
                    }

                    *failures += 1;
                    if attempt + 1 < MAX_ATTEMPTS_PER_TICK {
                        time::sleep(retries.delay_for(*failures - 1)).await;
                    }
                }
            }
        }
        PollOutcome::GaveUp
    }

    /// Builds the request for one url
    fn request(&self, url: &str) -> RequestBuilder {
        let config = &self.spec.config;
        let method = Method::from_bytes(config.method.as_bytes()).unwrap_or(Method::GET);

        let mut request = self.client.request(method, url);
        for header in &config.headers {
            request = request.header(header.name.as_str(), header.value.as_str());
        }
        if !config.body.is_empty() {
            request = request.body(config.body.clone());
        }
        if let Some(username) = &config.username {
            request = request.basic_auth(username, config.password.as_ref());
        }
        request
    }
}

/// Logs a job message at the tracing level matching its syslog severity
fn emit(severity: Severity, job: &str, message: &str) {
    match severity.value() {
        0..=3 => error!(job = job, severity = severity.value(), "{}", message),
        4 => warn!(job = job, severity = severity.value(), "{}", message),
        5 | 6 => info!(job = job, severity = severity.value(), "{}", message),
        _ => debug!(job = job, severity = severity.value(), "{}", message),
    }
}
