//! Payment authorizer trait and in-memory implementation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use common::{Money, OrderId, PaymentId};
use thiserror::Error;

/// What the authorizer is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
}

/// A definite answer from the authorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Approved,
    Rejected,
}

impl AuthorizationOutcome {
    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationOutcome::Approved => "approved",
            AuthorizationOutcome::Rejected => "rejected",
        }
    }
}

/// The authorizer could not give a definite answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authorizer timed out")]
    Timeout,

    #[error("unexpected status code {0}")]
    UnexpectedStatus(u16),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// An external yes/no oracle consulted when authorizing a payment.
#[async_trait]
pub trait PaymentAuthorizer: Send + Sync {
    async fn check_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationOutcome, AuthorizerError>;
}

#[async_trait]
impl<T: PaymentAuthorizer + ?Sized> PaymentAuthorizer for Arc<T> {
    async fn check_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationOutcome, AuthorizerError> {
        (**self).check_authorization(request).await
    }
}

#[derive(Debug)]
struct InMemoryAuthorizerState {
    scripted: VecDeque<Result<AuthorizationOutcome, AuthorizerError>>,
    default_outcome: AuthorizationOutcome,
    requests: Vec<AuthorizationRequest>,
}

/// In-memory authorizer for tests and offline runs.
///
/// Answers from the scripted queue first, then with the default outcome.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentAuthorizer {
    state: Arc<Mutex<InMemoryAuthorizerState>>,
}

impl Default for InMemoryPaymentAuthorizer {
    fn default() -> Self {
        Self::with_default(AuthorizationOutcome::Approved)
    }
}

impl InMemoryPaymentAuthorizer {
    /// Creates an authorizer that approves everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an authorizer that rejects everything.
    pub fn rejecting() -> Self {
        Self::with_default(AuthorizationOutcome::Rejected)
    }

    fn with_default(default_outcome: AuthorizationOutcome) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryAuthorizerState {
                scripted: VecDeque::new(),
                default_outcome,
                requests: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, InMemoryAuthorizerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues the answer for the next unanswered call.
    pub fn enqueue(&self, answer: Result<AuthorizationOutcome, AuthorizerError>) {
        self.state().scripted.push_back(answer);
    }

    /// Changes the answer given once the queue is empty.
    pub fn set_default(&self, outcome: AuthorizationOutcome) {
        self.state().default_outcome = outcome;
    }

    /// Returns how many times the authorizer has been consulted.
    pub fn call_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Returns every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<AuthorizationRequest> {
        self.state().requests.clone()
    }
}

#[async_trait]
impl PaymentAuthorizer for InMemoryPaymentAuthorizer {
    async fn check_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationOutcome, AuthorizerError> {
        let mut state = self.state();
        state.requests.push(request.clone());
        match state.scripted.pop_front() {
            Some(answer) => answer,
            None => Ok(state.default_outcome),
        }
    }
}
