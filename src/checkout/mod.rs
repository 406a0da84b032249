//! Checkout
//!
//! Validates the checkout form, re-confirms the applied voucher with the
//! server, assembles the order payload and hands it to the payment dispatcher.
//! A checkout in flight rejects further submissions until it settles.

use std::sync::{Arc, Mutex, MutexGuard};

use jiff::Timestamp;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    api::{ApiError, Order, OrderId, VoucherService, VoucherValidation},
    money::{Amount, AmountError, from_decimal},
    payments::{DispatchFailure, DispatchResult, PaymentDispatcher, PaymentStrategy, QrSession},
    pricing::PricingError,
    session::{CartSession, SessionError},
    vouchers::{
        Evaluation, Ineligibility, Voucher, VoucherCode, VoucherCodeError, VoucherError,
        VoucherKind, evaluate,
    },
};

pub mod address;
pub mod form;
pub mod order;

pub use address::{AddressCascade, AddressError, AddressId, NewAddressForm, ShippingAddress};
pub use form::{CheckoutForm, Field, FieldError, ValidatedForm, ValidationErrors};
pub use order::{CheckoutOrder, OrderLine, ResolvedVoucher};

const GENERIC_FAILURE: &str = "We could not place your order. Please try again.";
const VOUCHER_REJECTED: &str = "This voucher cannot be used for your order.";
const MISSING_PAYMENT_LINK: &str = "The payment gateway did not return a payment link. Please try again.";

/// Errors raised by the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A submission is already in flight.
    #[error("checkout is already being submitted")]
    AlreadySubmitting,

    /// The form is incomplete.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The typed code is malformed.
    #[error(transparent)]
    InvalidCode(#[from] VoucherCodeError),

    /// The server refused the voucher.
    #[error("{0}")]
    VoucherRejected(String),

    /// The server accepted the voucher but it does not apply to this cart.
    #[error(transparent)]
    Ineligible(#[from] Ineligibility),

    /// Talking to the server failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The order could not be dispatched.
    #[error(transparent)]
    Dispatch(#[from] DispatchFailure),

    /// Cart session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The cart could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// The voucher could not be evaluated.
    #[error(transparent)]
    Voucher(#[from] VoucherError),

    /// A server amount could not be represented.
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// A thread panicked while holding checkout state.
    #[error("checkout state lock poisoned")]
    Poisoned,
}

impl CheckoutError {
    /// Message to show the customer: the server's own words when available,
    /// otherwise a generic fallback.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadySubmitting => "Your order is already being placed.".to_string(),
            Self::Validation(errors) => errors.to_string(),
            Self::InvalidCode(error) => error.to_string(),
            Self::VoucherRejected(message) => message.clone(),
            Self::Ineligible(reason) => reason.to_string(),
            Self::Api(error)
            | Self::Dispatch(
                DispatchFailure::Api(error) | DispatchFailure::QrSessionFailed { source: error, .. },
            ) => error
                .server_message()
                .map_or_else(|| GENERIC_FAILURE.to_string(), str::to_string),
            Self::Dispatch(
                DispatchFailure::MissingPaymentUrl(_) | DispatchFailure::MissingQrCode { .. },
            ) => MISSING_PAYMENT_LINK.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Where a checkout stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CheckoutState {
    /// Nothing submitted yet.
    #[default]
    Idle,

    /// A submission is in flight.
    Submitting,

    /// The order was created.
    OrderCreated(OrderId),

    /// The customer is being sent to a payment gateway.
    RedirectPending {
        /// Gateway payment page.
        url: String,
    },

    /// A QR code is on screen for the order.
    QrPresented(OrderId),

    /// The last submission failed with this message.
    Failed(String),
}

/// A successful submission.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// The order exists; the cart has been cleared.
    OrderCreated(Order),

    /// Send the customer to the gateway; the cart is kept until payment completes.
    Redirect {
        /// Gateway payment page.
        url: String,
    },

    /// Show the QR code; the order exists and the cart has been cleared.
    QrPresented(QrSession),
}

/// Drives a checkout over a shared cart session.
pub struct CheckoutOrchestrator {
    session: Arc<Mutex<CartSession>>,
    vouchers: Arc<dyn VoucherService>,
    dispatcher: PaymentDispatcher,
    state: Mutex<CheckoutState>,
    pending_qr: Mutex<Option<PendingQr>>,
}

/// An order created on a QR path whose payment session never opened.
#[derive(Debug, Clone)]
struct PendingQr {
    order: Order,
    payload: CheckoutOrder,
}

impl std::fmt::Debug for CheckoutOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutOrchestrator")
            .field("dispatcher", &self.dispatcher)
            .field("state", &self.state)
            .field("pending_qr", &self.pending_qr)
            .finish_non_exhaustive()
    }
}

/// Resets a submission left in flight, e.g. when its future is dropped.
struct SubmitGuard<'a> {
    state: &'a Mutex<CheckoutState>,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock()
            && *state == CheckoutState::Submitting
        {
            *state = CheckoutState::Idle;
        }
    }
}

impl CheckoutOrchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        session: Arc<Mutex<CartSession>>,
        vouchers: Arc<dyn VoucherService>,
        dispatcher: PaymentDispatcher,
    ) -> Self {
        Self {
            session,
            vouchers,
            dispatcher,
            state: Mutex::new(CheckoutState::Idle),
            pending_qr: Mutex::new(None),
        }
    }

    /// The shared cart session.
    #[must_use]
    pub fn session(&self) -> &Arc<Mutex<CartSession>> {
        &self.session
    }

    /// The current checkout state.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Poisoned`] if the state lock is poisoned.
    pub fn state(&self) -> Result<CheckoutState, CheckoutError> {
        Ok(self.lock_state()?.clone())
    }

    /// Vouchers the customer can pick for the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be priced or the lookup fails.
    #[tracing::instrument(name = "checkout.available_vouchers", skip(self), err)]
    pub async fn available_vouchers(&self) -> Result<Vec<Voucher>, CheckoutError> {
        let subtotal = self.lock_session()?.subtotal()?;

        Ok(self.vouchers.list_available(subtotal).await?)
    }

    /// Validate a typed code with the server and apply it.
    ///
    /// A rejection leaves any previously applied voucher in place.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::InvalidCode`]: the code is malformed; no call is made.
    /// - [`CheckoutError::VoucherRejected`]: the server refused the code.
    /// - [`CheckoutError::Ineligible`]: the voucher does not apply to this cart.
    /// - any other variant: the lookup or evaluation failed.
    #[tracing::instrument(name = "checkout.apply_voucher_code", skip(self), err)]
    pub async fn apply_voucher_code(&self, raw: &str) -> Result<Evaluation, CheckoutError> {
        let code = VoucherCode::parse(raw)?;

        self.apply_code(code).await
    }

    /// Apply a voucher picked from [`Self::available_vouchers`].
    ///
    /// The catalog code is used as issued, then validated like a typed one.
    ///
    /// # Errors
    ///
    /// As for [`Self::apply_voucher_code`], minus the code shape check.
    #[tracing::instrument(
        name = "checkout.apply_listed_voucher",
        skip(self, voucher),
        fields(code = %voucher.code),
        err
    )]
    pub async fn apply_listed_voucher(&self, voucher: &Voucher) -> Result<Evaluation, CheckoutError> {
        self.apply_code(voucher.code.clone()).await
    }

    async fn apply_code(&self, code: VoucherCode) -> Result<Evaluation, CheckoutError> {
        let subtotal = self.lock_session()?.subtotal()?;

        let validation = self
            .vouchers
            .validate(&code, subtotal)
            .await
            .map_err(rejection)?;

        let voucher = accepted_voucher(validation, &code)?.0;

        let mut session = self.lock_session()?;
        let subtotal = session.subtotal()?;

        if let Some(reason) = evaluate(Some(&voucher), &subtotal, Timestamp::now())?.ineligibility {
            info!(%code, %reason, "voucher not applicable to cart");

            return Err(reason.into());
        }

        let evaluation = session.apply_voucher(voucher)?;

        info!(
            %code,
            discount = evaluation.discount.to_minor_units(),
            "voucher applied"
        );

        Ok(evaluation)
    }

    /// Drop the applied voucher.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Poisoned`] if the session lock is poisoned.
    pub fn remove_voucher(&self) -> Result<(), CheckoutError> {
        self.lock_session()?.remove_voucher();

        Ok(())
    }

    /// Submit the checkout.
    ///
    /// Local validation runs first and makes no network call. While a
    /// submission is in flight further calls fail with
    /// [`CheckoutError::AlreadySubmitting`].
    ///
    /// # Errors
    ///
    /// Returns the first failure; [`CheckoutError::user_message`] renders it.
    #[tracing::instrument(
        name = "checkout.submit",
        skip(self, form),
        fields(payment_method = %form.payment_method),
        err
    )]
    pub async fn submit(&self, form: &CheckoutForm) -> Result<CheckoutOutcome, CheckoutError> {
        let validated = {
            let mut state = self.lock_state()?;

            if *state == CheckoutState::Submitting {
                warn!("checkout submitted while a submission is in flight");

                return Err(CheckoutError::AlreadySubmitting);
            }

            let validated = form.validate(self.lock_session()?.items())?;

            *state = CheckoutState::Submitting;

            validated
        };

        let guard = SubmitGuard { state: &self.state };
        let result = self.place_order(&validated).await;

        let next = match &result {
            Ok(CheckoutOutcome::OrderCreated(order)) => CheckoutState::OrderCreated(order.id.clone()),
            Ok(CheckoutOutcome::Redirect { url }) => CheckoutState::RedirectPending { url: url.clone() },
            Ok(CheckoutOutcome::QrPresented(session)) => {
                CheckoutState::QrPresented(session.order.id.clone())
            }
            Err(error) => CheckoutState::Failed(error.user_message()),
        };

        *self.lock_state()? = next;

        drop(guard);

        result
    }

    async fn place_order(&self, form: &ValidatedForm) -> Result<CheckoutOutcome, CheckoutError> {
        let (items, subtotal, applied) = {
            let session = self.lock_session()?;

            (
                session.items().to_vec(),
                session.subtotal()?,
                session.applied_voucher().cloned(),
            )
        };

        let resolved = match applied {
            Some(voucher) => Some(self.resolve_voucher(voucher, subtotal).await?),
            None => None,
        };

        let payload = CheckoutOrder::assemble(&items, form, resolved.as_ref())?;

        let result = match (self.take_pending_qr(&payload)?, form.payment_method.strategy()) {
            (Some(created), PaymentStrategy::Qr(gateway)) => {
                info!(order_id = %created.id, %gateway, "retrying qr session for existing order");

                self.dispatcher.resume_qr(gateway, created, &payload).await
            }
            _ => self.dispatcher.dispatch(form.payment_method, &payload).await,
        };

        match result {
            DispatchResult::Created(created) => {
                self.lock_session()?.clear();

                Ok(CheckoutOutcome::OrderCreated(created))
            }
            DispatchResult::Redirect { url } => Ok(CheckoutOutcome::Redirect { url }),
            DispatchResult::QrSession(session) => {
                self.lock_session()?.clear();

                Ok(CheckoutOutcome::QrPresented(session))
            }
            DispatchResult::Failed(failure) => {
                if let Some(order) = failure.created_order() {
                    *self.lock_pending_qr()? = Some(PendingQr {
                        order: order.clone(),
                        payload,
                    });
                }

                Err(failure.into())
            }
        }
    }

    /// Take the order left by a failed QR session when `payload` still
    /// describes it. A QR retry then reuses it instead of creating another.
    fn take_pending_qr(&self, payload: &CheckoutOrder) -> Result<Option<Order>, CheckoutError> {
        let Some(pending) = self.lock_pending_qr()?.take() else {
            return Ok(None);
        };

        if pending.payload == *payload {
            return Ok(Some(pending.order));
        }

        warn!(
            order_id = %pending.order.id,
            "cart or payment changed since the unpaid qr order; placing a new order"
        );

        Ok(None)
    }

    /// Re-validate the applied voucher against the live subtotal.
    ///
    /// The server's discount is authoritative; without one the evaluator
    /// computes it from the returned definition.
    async fn resolve_voucher(
        &self,
        applied: Voucher,
        subtotal: Amount,
    ) -> Result<ResolvedVoucher, CheckoutError> {
        let validation = self
            .vouchers
            .validate(&applied.code, subtotal)
            .await
            .map_err(rejection)?;

        let (voucher, server_discount) = accepted_voucher(validation, &applied.code)?;

        let discount = match server_discount {
            Some(discount) => from_decimal(discount)?,
            None => evaluate(Some(&voucher), &subtotal, Timestamp::now())?.discount,
        };

        Ok(ResolvedVoucher {
            code: voucher.code.clone(),
            discount,
            free_shipping: voucher.kind == VoucherKind::FreeShipping,
        })
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, CheckoutState>, CheckoutError> {
        self.state.lock().map_err(|_poisoned| CheckoutError::Poisoned)
    }

    fn lock_pending_qr(&self) -> Result<MutexGuard<'_, Option<PendingQr>>, CheckoutError> {
        self.pending_qr
            .lock()
            .map_err(|_poisoned| CheckoutError::Poisoned)
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, CartSession>, CheckoutError> {
        self.session
            .lock()
            .map_err(|_poisoned| CheckoutError::Poisoned)
    }
}

/// Turn a validation response into the accepted voucher and server discount.
fn accepted_voucher(
    validation: VoucherValidation,
    code: &VoucherCode,
) -> Result<(Voucher, Option<Decimal>), CheckoutError> {
    let VoucherValidation {
        valid,
        voucher,
        message,
        discount_amount,
    } = validation;

    match voucher {
        Some(voucher) if valid => Ok((voucher, discount_amount)),
        _ => {
            let message = message
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| VOUCHER_REJECTED.to_string());

            info!(%code, %message, "voucher rejected");

            Err(CheckoutError::VoucherRejected(message))
        }
    }
}

/// Surface a server refusal of a voucher as a rejection.
fn rejection(error: ApiError) -> CheckoutError {
    match error {
        ApiError::Server { message, status } if status.is_client_error() => {
            CheckoutError::VoucherRejected(message)
        }
        other => CheckoutError::Api(other),
    }
}
