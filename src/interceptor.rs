//! Interceptor chain wrapped around every outbound request.
//!
//! Stages run outermost first. [`Chain::standard`] assembles the console's
//! stack: credentials, failure classification, busy tracking and, when
//! configured, a timeout closest to the transport.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::auth::Session;
use crate::config::Api;
use crate::http::{BoxFuture, FailureKind, HttpFailure, Outcome, Request, Transport};
use crate::loading::LoadingCounter;
use crate::notify::Notifier;

/// A cross-cutting wrapper around request dispatch.
pub trait Interceptor: Send + Sync {
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Outcome>;
}

/// The remainder of the chain after the current stage.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    /// Pass the request on to the next stage, or the transport.
    pub fn run(self, request: Request) -> BoxFuture<'a, Outcome> {
        match self.rest.split_first() {
            Some((stage, rest)) => stage.intercept(
                request,
                Next {
                    rest,
                    transport: self.transport,
                },
            ),
            None => self.transport.send(request),
        }
    }
}

/// Ordered interceptor stages in front of a transport.
#[derive(Clone)]
pub struct Chain {
    stages: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl Chain {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            stages: Vec::new(),
            transport,
        }
    }

    /// Append a stage inside the ones already added.
    pub fn with(mut self, stage: impl Interceptor + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Auth → Error → Loading → Timeout.
    pub fn standard(
        transport: Arc<dyn Transport>,
        session: Arc<Session>,
        notifier: Arc<dyn Notifier>,
        counter: LoadingCounter,
        api: &Api,
    ) -> Self {
        let chain = Self::new(transport)
            .with(AuthStage::new(Arc::clone(&session)))
            .with(ErrorStage::new(session, notifier, &api.login_endpoint))
            .with(LoadingStage::new(counter));
        match api.request_timeout() {
            Some(timeout) => chain.with(TimeoutStage::new(timeout)),
            None => chain,
        }
    }

    pub async fn send(&self, request: Request) -> Outcome {
        Next {
            rest: &self.stages,
            transport: self.transport.as_ref(),
        }
        .run(request)
        .await
    }
}

/// Attaches the current credential to outgoing requests.
pub struct AuthStage {
    session: Arc<Session>,
}

impl AuthStage {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

impl Interceptor for AuthStage {
    fn intercept<'a>(&'a self, mut request: Request, next: Next<'a>) -> BoxFuture<'a, Outcome> {
        if !request.headers.contains_key(hyper::header::AUTHORIZATION)
            && let Some(token) = self.session.token()
        {
            match crate::auth::bearer(&token) {
                Ok(value) => {
                    request.headers.insert(hyper::header::AUTHORIZATION, value);
                }
                Err(_) => warn!("Session token is not a valid header value, sending without it"),
            }
        }
        next.run(request)
    }
}

/// Failure taxonomy used by [`ErrorStage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// 401 outside of a login attempt.
    AuthExpired,
    /// 401 or 400 answering a login attempt.
    LoginRejected,
    Forbidden,
    NotFound,
    ServerError,
    /// No status: the server was never reached or never answered.
    NetworkUnavailable,
    Unclassified,
}

impl ErrorClass {
    pub fn classify(failure: &HttpFailure, is_login: bool) -> Self {
        let Some(status) = failure.status else {
            return ErrorClass::NetworkUnavailable;
        };
        match status.as_u16() {
            401 | 400 if is_login => ErrorClass::LoginRejected,
            401 => ErrorClass::AuthExpired,
            403 => ErrorClass::Forbidden,
            404 => ErrorClass::NotFound,
            s if s >= 500 => ErrorClass::ServerError,
            _ => ErrorClass::Unclassified,
        }
    }
}

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password.";
pub const NOT_FOUND_MESSAGE: &str = "The requested resource was not found.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
pub const NETWORK_MESSAGE: &str = "Unable to reach the server. Check your connection.";
pub const GENERIC_MESSAGE: &str = "An unexpected error occurred.";

/// Classifies failures, performs one side effect per class and hands the
/// original failure back unchanged.
pub struct ErrorStage {
    session: Arc<Session>,
    notifier: Arc<dyn Notifier>,
    login_endpoint: String,
}

impl ErrorStage {
    pub fn new(session: Arc<Session>, notifier: Arc<dyn Notifier>, login_endpoint: &str) -> Self {
        Self {
            session,
            notifier,
            login_endpoint: login_endpoint.to_string(),
        }
    }

    fn is_login_request(&self, request: &Request) -> bool {
        request.path().ends_with(&self.login_endpoint)
    }

    fn react(&self, failure: &HttpFailure, class: ErrorClass) {
        warn!(
            method = %failure.method,
            url = %failure.url,
            status = ?failure.status.map(|s| s.as_u16()),
            ?class,
            "Request failed"
        );
        match class {
            ErrorClass::AuthExpired => {
                self.session.logout();
                self.notifier.error(SESSION_EXPIRED_MESSAGE);
            }
            ErrorClass::LoginRejected => self.notifier.error(INVALID_CREDENTIALS_MESSAGE),
            ErrorClass::Forbidden => {
                let role = self
                    .session
                    .principal()
                    .map_or("UNAUTHENTICATED", |p| p.role.as_str());
                self.notifier.error(&format!(
                    "Access denied: your role ({role}) does not have permission for this action."
                ));
            }
            ErrorClass::NotFound => self.notifier.error(NOT_FOUND_MESSAGE),
            ErrorClass::ServerError => self.notifier.error(SERVER_ERROR_MESSAGE),
            ErrorClass::NetworkUnavailable => self.notifier.error(NETWORK_MESSAGE),
            ErrorClass::Unclassified => {
                let message = failure
                    .payload_message()
                    .unwrap_or_else(|| GENERIC_MESSAGE.to_string());
                self.notifier.error(&message);
            }
        }
    }
}

impl Interceptor for ErrorStage {
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Outcome> {
        let is_login = self.is_login_request(&request);
        Box::pin(async move {
            let outcome = next.run(request).await;
            if let Err(failure) = &outcome {
                self.react(failure, ErrorClass::classify(failure, is_login));
            }
            outcome
        })
    }
}

/// Holds the loading counter raised for as long as the request is in flight.
pub struct LoadingStage {
    counter: LoadingCounter,
}

impl LoadingStage {
    pub fn new(counter: LoadingCounter) -> Self {
        Self { counter }
    }
}

impl Interceptor for LoadingStage {
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let _busy = self.counter.enter();
            next.run(request).await
        })
    }
}

/// Fails requests that take longer than a fixed budget.
pub struct TimeoutStage {
    timeout: Duration,
}

impl TimeoutStage {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Interceptor for TimeoutStage {
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Outcome> {
        let method = request.method.clone();
        let url = request.url.clone();
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, next.run(request)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!(%method, %url, timeout = ?self.timeout, "Request timed out");
                    Err(HttpFailure::transport(
                        method,
                        url,
                        FailureKind::Timeout,
                        format!("no response within {:?}", self.timeout),
                    ))
                }
            }
        })
    }
}
