//! Payment workflow: one payment per order, authorized by an external oracle.

use std::time::Instant;

use chrono::Utc;
use common::{OrderId, Page, PageRequest, Payment, PaymentId, PaymentStatus};
use store::{Store, StoreError, UnitOfWork};

use crate::error::DomainError;

use super::{AuthorizationOutcome, AuthorizationRequest, PaymentAuthorizer, PaymentError};

const UNIQUE_PAYMENT_PER_ORDER: &str = "unique_payment_per_order";

/// Service for creating and authorizing payments.
pub struct PaymentWorkflow<S: Store, A: PaymentAuthorizer> {
    store: S,
    authorizer: A,
}

impl<S: Store, A: PaymentAuthorizer> PaymentWorkflow<S, A> {
    /// Creates a new payment workflow.
    pub fn new(store: S, authorizer: A) -> Self {
        Self { store, authorizer }
    }

    /// Opens a pending payment for the full order total and links it to the
    /// order.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, order_id: OrderId) -> Result<Payment, DomainError> {
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .find_order_for_update(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound(order_id))?;

        if order.payment_id.is_some() {
            return Err(PaymentError::AlreadyExists { order_id }.into());
        }

        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new(),
            order_id,
            amount: order.total,
            status: PaymentStatus::Pending,
            created_at: now,
            authorized_at: None,
            updated_at: now,
        };
        let payment = uow.save_payment(payment).await.map_err(|err| match err {
            StoreError::UniqueViolation { ref constraint }
                if constraint == UNIQUE_PAYMENT_PER_ORDER =>
            {
                DomainError::from(PaymentError::AlreadyExists { order_id })
            }
            other => other.into(),
        })?;

        order.payment_id = Some(payment.id);
        uow.save_order(order).await?;
        uow.commit().await?;

        metrics::counter!("payments_created_total").increment(1);
        tracing::info!(payment_id = %payment.id, %order_id, amount = %payment.amount, "payment created");
        Ok(payment)
    }

    /// Loads a payment by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, payment_id: PaymentId) -> Result<Payment, DomainError> {
        let mut uow = self.store.begin().await?;
        let payment = uow.find_payment(payment_id).await?;
        uow.rollback().await?;
        payment.ok_or_else(|| PaymentError::NotFound(payment_id).into())
    }

    /// Lists payments oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, request: PageRequest) -> Result<Page<Payment>, DomainError> {
        let mut uow = self.store.begin().await?;
        let page = uow.list_payments(request).await?;
        uow.rollback().await?;
        Ok(page)
    }

    /// Asks the authorizer to approve a payment and records the answer.
    ///
    /// No unit of work is open while the authorizer is consulted. The payment
    /// is reloaded and locked afterwards, so a concurrent approval that lands
    /// first wins and this call fails with [`PaymentError::AlreadyPaid`].
    #[tracing::instrument(skip(self))]
    pub async fn authorize(&self, payment_id: PaymentId) -> Result<Payment, DomainError> {
        let request = {
            let mut uow = self.store.begin().await?;
            let payment = uow
                .find_payment(payment_id)
                .await?
                .ok_or(PaymentError::NotFound(payment_id))?;
            uow.rollback().await?;

            if !payment.status.can_authorize() {
                return Err(PaymentError::AlreadyPaid.into());
            }
            AuthorizationRequest {
                payment_id,
                order_id: payment.order_id,
                amount: payment.amount,
            }
        };

        let started = Instant::now();
        let answer = self.authorizer.check_authorization(&request).await;
        metrics::histogram!("payment_authorizer_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let outcome = match answer {
            Ok(outcome) => outcome,
            Err(err) => {
                metrics::counter!("payment_authorizations_total", "outcome" => "unavailable")
                    .increment(1);
                tracing::warn!(%payment_id, error = %err, "payment authorizer unavailable");
                return Err(PaymentError::AuthorizerUnavailable(err.to_string()).into());
            }
        };
        metrics::counter!("payment_authorizations_total", "outcome" => outcome.as_str())
            .increment(1);

        let mut uow = self.store.begin().await?;
        let mut payment = uow
            .find_payment_for_update(payment_id)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))?;
        if !payment.status.can_authorize() {
            return Err(PaymentError::AlreadyPaid.into());
        }

        let now = Utc::now();
        payment.updated_at = now;
        match outcome {
            AuthorizationOutcome::Rejected => {
                payment.status = PaymentStatus::Failed;
                uow.save_payment(payment).await?;
                uow.commit().await?;
                tracing::info!(%payment_id, "payment not authorized");
                Err(PaymentError::NotAuthorized.into())
            }
            AuthorizationOutcome::Approved => {
                payment.status = PaymentStatus::Paid;
                payment.authorized_at = Some(now);
                let payment = uow.save_payment(payment).await?;

                if let Some(mut order) = uow.find_order_for_update(payment.order_id).await?
                    && order.payment_id != Some(payment.id)
                {
                    order.payment_id = Some(payment.id);
                    uow.save_order(order).await?;
                }
                uow.commit().await?;

                tracing::info!(%payment_id, order_id = %payment.order_id, "payment authorized");
                Ok(payment)
            }
        }
    }
}
