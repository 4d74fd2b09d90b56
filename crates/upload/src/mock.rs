//! Scripted collaborators shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use sluice_protocol::messages::{
    CompleteSessionRequest, CompleteSessionResponse, ReportPartRequest, SignedUrlQuery,
    SignedUrlResponse, StartSessionRequest, StartSessionResponse,
};
use tokio_util::sync::CancellationToken;

use crate::error::RemoteError;
use crate::remote::{Coordinator, ObjectStore, RemoteFuture};

/// A call observed by [`MockCoordinator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(StartSessionRequest),
    SignedUrl(u32),
    Report(ReportPartRequest),
    Complete(CompleteSessionRequest),
}

pub fn status(status: u16) -> RemoteError {
    RemoteError::Status {
        status,
        body: String::new(),
    }
}

/// Coordinator that succeeds unless told otherwise.
pub struct MockCoordinator {
    start_result: Mutex<Option<Result<StartSessionResponse, RemoteError>>>,
    complete_result: Mutex<Option<Result<CompleteSessionResponse, RemoteError>>>,
    signed_url_failures: Mutex<HashMap<u32, VecDeque<RemoteError>>>,
    report_failures: Mutex<HashMap<u32, VecDeque<RemoteError>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockCoordinator {
    pub fn new() -> Self {
        Self {
            start_result: Mutex::new(None),
            complete_result: Mutex::new(None),
            signed_url_failures: Mutex::new(HashMap::new()),
            report_failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_start(&self, err: RemoteError) {
        *self.start_result.lock().unwrap() = Some(Err(err));
    }

    pub fn fail_complete(&self, err: RemoteError) {
        *self.complete_result.lock().unwrap() = Some(Err(err));
    }

    /// Queues failures returned by the next signed URL requests for `part`.
    pub fn fail_signed_url(&self, part: u32, errors: Vec<RemoteError>) {
        self.signed_url_failures
            .lock()
            .unwrap()
            .entry(part)
            .or_default()
            .extend(errors);
    }

    /// Queues failures returned by the next acknowledgements of `part`.
    pub fn fail_report(&self, part: u32, errors: Vec<RemoteError>) {
        self.report_failures
            .lock()
            .unwrap()
            .entry(part)
            .or_default()
            .extend(errors);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn signed_url_count(&self, part: u32) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::SignedUrl(n) if *n == part))
            .count()
    }

    pub fn reports(&self) -> Vec<ReportPartRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Report(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn complete_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Complete(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_failure(
        failures: &Mutex<HashMap<u32, VecDeque<RemoteError>>>,
        part: u32,
    ) -> Option<RemoteError> {
        failures
            .lock()
            .unwrap()
            .get_mut(&part)
            .and_then(VecDeque::pop_front)
    }
}

impl Coordinator for MockCoordinator {
    fn start_session(&self, req: StartSessionRequest) -> RemoteFuture<'_, StartSessionResponse> {
        let storage_key = req.filename.clone();
        self.record(Call::Start(req));
        let result = self.start_result.lock().unwrap().take();
        Box::pin(async move {
            result.unwrap_or(Ok(StartSessionResponse {
                upload_id: "upload-1".into(),
                storage_key,
            }))
        })
    }

    fn get_signed_url(&self, query: SignedUrlQuery) -> RemoteFuture<'_, SignedUrlResponse> {
        self.record(Call::SignedUrl(query.part_number));
        let generation = self.signed_url_count(query.part_number);
        let failure = Self::next_failure(&self.signed_url_failures, query.part_number);
        Box::pin(async move {
            if let Some(err) = failure {
                return Err(err);
            }
            Ok(SignedUrlResponse {
                signed_url: format!(
                    "https://store.test/{}?uploadId={}&part={}&gen={generation}",
                    query.storage_key, query.upload_id, query.part_number
                ),
            })
        })
    }

    fn report_part_complete(&self, req: ReportPartRequest) -> RemoteFuture<'_, ()> {
        let failure = Self::next_failure(&self.report_failures, req.part_number);
        self.record(Call::Report(req));
        Box::pin(async move {
            match failure {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }

    fn complete_session(
        &self,
        req: CompleteSessionRequest,
    ) -> RemoteFuture<'_, CompleteSessionResponse> {
        let location = format!("https://store.test/{}", req.storage_key);
        self.record(Call::Complete(req));
        let result = self.complete_result.lock().unwrap().take();
        Box::pin(async move {
            result.unwrap_or(Ok(CompleteSessionResponse {
                location,
                storage_key: None,
                message: None,
            }))
        })
    }
}

/// Extracts `part` and `gen` from a URL minted by [`MockCoordinator`].
pub fn url_param(url: &str, name: &str) -> Option<usize> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == name { value.parse().ok() } else { None }
    })
}

/// Object store that answers with a quoted ETag per part.
pub struct MockStore {
    failures: Mutex<HashMap<u32, VecDeque<RemoteError>>>,
    permanent: Mutex<HashMap<u32, RemoteError>>,
    /// Rejects URLs minted before this generation with 403.
    min_generation: Mutex<HashMap<u32, usize>>,
    cancel_on_part: Mutex<Option<(u32, CancellationToken)>>,
    puts: Mutex<Vec<(String, Bytes)>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            permanent: Mutex::new(HashMap::new()),
            min_generation: Mutex::new(HashMap::new()),
            cancel_on_part: Mutex::new(None),
            puts: Mutex::new(Vec::new()),
            latency: Duration::from_millis(10),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Queues failures for the next PUTs of `part`.
    pub fn fail_part(&self, part: u32, errors: Vec<RemoteError>) {
        self.failures
            .lock()
            .unwrap()
            .entry(part)
            .or_default()
            .extend(errors);
    }

    /// Every PUT of `part` fails with `err`.
    pub fn always_fail(&self, part: u32, err: RemoteError) {
        self.permanent.lock().unwrap().insert(part, err);
    }

    /// URLs for `part` are only honored from the given generation on.
    pub fn expire_urls_before(&self, part: u32, generation: usize) {
        self.min_generation.lock().unwrap().insert(part, generation);
    }

    /// Cancels `token` when `part` is PUT, then never answers.
    pub fn cancel_on(&self, part: u32, token: CancellationToken) {
        *self.cancel_on_part.lock().unwrap() = Some((part, token));
    }

    pub fn puts(&self) -> Vec<(String, Bytes)> {
        self.puts.lock().unwrap().clone()
    }

    pub fn put_count(&self, part: u32) -> usize {
        self.puts()
            .iter()
            .filter(|(url, _)| url_param(url, "part") == Some(part as usize))
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MockStore {
    fn put_chunk(&self, signed_url: String, data: Bytes) -> RemoteFuture<'_, String> {
        let part = url_param(&signed_url, "part").unwrap_or_default() as u32;
        let generation = url_param(&signed_url, "gen").unwrap_or_default();
        self.puts.lock().unwrap().push((signed_url, data));

        let expired = self
            .min_generation
            .lock()
            .unwrap()
            .get(&part)
            .is_some_and(|min| generation < *min);
        let failure = if expired {
            Some(status(403))
        } else {
            self.permanent.lock().unwrap().get(&part).cloned().or_else(|| {
                self.failures
                    .lock()
                    .unwrap()
                    .get_mut(&part)
                    .and_then(VecDeque::pop_front)
            })
        };
        let cancel = self
            .cancel_on_part
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(p, _)| *p == part)
            .map(|(_, token)| token.clone());

        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(token) = cancel {
                token.cancel();
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(self.latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match failure {
                Some(err) => Err(err),
                None => Ok(format!("\"etag-{part}\"")),
            }
        })
    }
}
