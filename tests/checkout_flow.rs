//! Checkout flows over a cart session with mocked storefront services.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use tailwag::{
    api::{
        ApiError, GatewaySession, GatewaySessionRequest, MockOrderService, MockVoucherService, Order,
        OrderId, OrderService, VoucherValidation,
    },
    cart::{CartLineItem, ProductId},
    checkout::{
        AddressId, CheckoutError, CheckoutForm, CheckoutOrchestrator, CheckoutOrder, CheckoutOutcome,
        CheckoutState, ShippingAddress,
    },
    discount::MemoryStore,
    money::{amount, zero},
    payments::{Gateway, PaymentDispatcher, PaymentMethod},
    session::CartSession,
    vouchers::{Ineligibility, Voucher, VoucherCode, VoucherKind},
};
use testresult::TestResult;
use tokio::sync::Notify;

fn line(id: u64, price: i64, quantity: u32) -> Result<CartLineItem, tailwag::cart::CartError> {
    CartLineItem::new(ProductId(id), format!("product {id}"), amount(price), quantity)
}

fn session_with(items: Vec<CartLineItem>) -> Result<CartSession, tailwag::session::SessionError> {
    CartSession::restore(items, Arc::new(MemoryStore::new()))
}

fn form(payment_method: PaymentMethod) -> CheckoutForm {
    CheckoutForm {
        saved_addresses: vec![ShippingAddress {
            id: Some(AddressId(7)),
            recipient_name: "Lan".to_string(),
            phone: "0901234567".to_string(),
            line: "12 Le Loi".to_string(),
            ward: "Ben Nghe".to_string(),
            district: "District 1".to_string(),
            city: "Ho Chi Minh".to_string(),
            is_default: true,
        }],
        selected_address: Some(AddressId(7)),
        payment_method,
        ..CheckoutForm::default()
    }
}

fn created(id: u64) -> Order {
    Order {
        id: OrderId::Numeric(id),
        status: Some("pending".to_string()),
        total_amount: None,
        payment_method: None,
        created_at: None,
    }
}

fn accepted(voucher: Voucher, discount: Option<i64>) -> VoucherValidation {
    VoucherValidation {
        valid: true,
        voucher: Some(voucher),
        message: None,
        discount_amount: discount.map(Decimal::from),
    }
}

fn save20k() -> Result<Voucher, tailwag::vouchers::VoucherCodeError> {
    Ok(Voucher::new(
        VoucherCode::parse("SAVE20K")?,
        VoucherKind::FixedAmount,
        Decimal::from(20_000),
    )
    .with_min_order(Decimal::from(100_000)))
}

fn pet10() -> Result<Voucher, tailwag::vouchers::VoucherCodeError> {
    Ok(Voucher::new(VoucherCode::parse("PET10")?, VoucherKind::Percentage, Decimal::TEN)
        .with_max_discount(Decimal::from(40_000)))
}

fn orchestrator(
    session: CartSession,
    vouchers: MockVoucherService,
    orders: impl OrderService + 'static,
) -> CheckoutOrchestrator {
    CheckoutOrchestrator::new(
        Arc::new(Mutex::new(session)),
        Arc::new(vouchers),
        PaymentDispatcher::new(Arc::new(orders)),
    )
}

fn cart_len(checkout: &CheckoutOrchestrator) -> Result<usize, String> {
    checkout
        .session()
        .lock()
        .map(|session| session.items().len())
        .map_err(|error| error.to_string())
}

#[test]
fn capped_percentage_voucher_on_500k() -> TestResult {
    let mut session = session_with(vec![line(1, 250_000, 2)?])?;

    let evaluation = session.apply_voucher(pet10()?)?;
    let totals = session.totals()?;

    assert_eq!(evaluation.discount, amount(40_000));
    assert_eq!(totals.subtotal, amount(500_000));
    assert_eq!(totals.total, amount(460_000));

    Ok(())
}

#[test]
fn fixed_voucher_below_minimum_is_ineligible() -> TestResult {
    let mut session = session_with(vec![line(1, 150_000, 1)?])?;
    let voucher = Voucher::new(
        VoucherCode::parse("BIG50K")?,
        VoucherKind::FixedAmount,
        Decimal::from(50_000),
    )
    .with_min_order(Decimal::from(200_000));

    let evaluation = session.apply_voucher(voucher)?;

    assert_eq!(
        evaluation.ineligibility,
        Some(Ineligibility::BelowMinimumOrder {
            minimum: amount(200_000)
        })
    );
    assert_eq!(session.totals()?.discount, zero());
    assert_eq!(session.totals()?.total, amount(150_000));

    Ok(())
}

#[test]
fn free_shipping_voucher_waives_shipping_only() -> TestResult {
    let mut session = session_with(vec![line(1, 300_000, 1)?])?;
    let voucher = Voucher::new(
        VoucherCode::parse("SHIPFREE")?,
        VoucherKind::FreeShipping,
        Decimal::ZERO,
    );

    let evaluation = session.apply_voucher(voucher)?;
    let totals = session.totals()?;

    assert!(evaluation.free_shipping);
    assert!(session.discount().is_free_shipping());
    assert_eq!(totals.discount, zero());
    assert_eq!(totals.shipping_fee, zero());
    assert_eq!(totals.total, amount(300_000));

    Ok(())
}

#[test]
fn dropping_below_minimum_zeroes_discount() -> TestResult {
    let mut session = session_with(vec![line(1, 160_000, 1)?, line(2, 90_000, 1)?])?;

    session.apply_voucher(save20k()?)?;

    assert_eq!(session.totals()?.subtotal, amount(250_000));
    assert_eq!(session.totals()?.discount, amount(20_000));

    let totals = session.remove_item(ProductId(1))?;

    assert_eq!(totals.subtotal, amount(90_000));
    assert_eq!(totals.discount, zero());
    assert!(matches!(
        session.discount().evaluation().and_then(|evaluation| evaluation.ineligibility),
        Some(Ineligibility::BelowMinimumOrder { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn rejected_code_keeps_previous_voucher() -> TestResult {
    let mut vouchers = MockVoucherService::new();
    let voucher = save20k()?;

    vouchers
        .expect_validate()
        .withf(|code, _| code.as_str() == "SAVE20K")
        .returning(move |_, _| Ok(accepted(voucher.clone(), None)));
    vouchers
        .expect_validate()
        .withf(|code, _| code.as_str() == "EXPIRED1")
        .returning(|_, _| {
            Ok(VoucherValidation {
                valid: false,
                voucher: None,
                message: Some("Voucher has expired".to_string()),
                discount_amount: None,
            })
        });

    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        vouchers,
        MockOrderService::new(),
    );

    checkout.apply_voucher_code("save20k").await?;

    let error = checkout
        .apply_voucher_code("expired1")
        .await
        .err()
        .ok_or("expected a rejection")?;

    assert!(matches!(&error, CheckoutError::VoucherRejected(message) if message == "Voucher has expired"));
    assert_eq!(error.user_message(), "Voucher has expired");

    let session = checkout.session().lock().map_err(|error| error.to_string())?;

    assert_eq!(
        session.applied_voucher().map(|voucher| voucher.code.as_str()),
        Some("SAVE20K")
    );
    assert_eq!(session.totals()?.discount, amount(20_000));

    Ok(())
}

#[tokio::test]
async fn server_refusal_is_a_rejection() -> TestResult {
    let mut vouchers = MockVoucherService::new();

    vouchers.expect_validate().returning(|_, _| {
        Err(ApiError::Server {
            status: StatusCode::NOT_FOUND,
            message: "Voucher not found".to_string(),
        })
    });

    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        vouchers,
        MockOrderService::new(),
    );

    let error = checkout
        .apply_voucher_code("NOPE")
        .await
        .err()
        .ok_or("expected a rejection")?;

    assert_eq!(error.user_message(), "Voucher not found");

    Ok(())
}

#[tokio::test]
async fn malformed_code_makes_no_call() -> TestResult {
    let mut vouchers = MockVoucherService::new();

    vouchers.expect_validate().never();

    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        vouchers,
        MockOrderService::new(),
    );

    let error = checkout.apply_voucher_code("   ").await.err().ok_or("expected an error")?;

    assert!(matches!(error, CheckoutError::InvalidCode(_)));

    Ok(())
}

#[tokio::test]
async fn incomplete_form_blocks_submission_without_network() -> TestResult {
    let mut vouchers = MockVoucherService::new();
    let mut orders = MockOrderService::new();

    vouchers.expect_validate().never();
    orders.expect_create().never();
    orders.expect_create_gateway_session().never();

    let checkout = orchestrator(session_with(vec![line(1, 150_000, 1)?])?, vouchers, orders);

    let error = checkout
        .submit(&CheckoutForm::default())
        .await
        .err()
        .ok_or("expected validation errors")?;

    assert!(matches!(error, CheckoutError::Validation(_)));
    assert_eq!(
        error.user_message(),
        "Please choose or enter a shipping address; Please enter a phone number"
    );
    assert_eq!(checkout.state()?, CheckoutState::Idle);

    Ok(())
}

#[tokio::test]
async fn cash_order_clears_cart_and_voucher() -> TestResult {
    let mut vouchers = MockVoucherService::new();
    let mut orders = MockOrderService::new();
    let voucher = pet10()?;

    vouchers
        .expect_validate()
        .times(2)
        .returning(move |_, _| Ok(accepted(voucher.clone(), None)));
    orders
        .expect_create()
        .withf(|order: &CheckoutOrder| {
            order.discount == 40_000
                && order.total_amount == 460_000
                && order.coupon_code.as_ref().map(VoucherCode::as_str) == Some("PET10")
                && order.payment_method == PaymentMethod::Cash
        })
        .times(1)
        .returning(|_| Ok(created(41)));
    orders.expect_create_gateway_session().never();

    let checkout = orchestrator(session_with(vec![line(1, 250_000, 2)?])?, vouchers, orders);

    checkout.apply_voucher_code("PET10").await?;

    let outcome = checkout.submit(&form(PaymentMethod::Cash)).await?;

    assert!(matches!(outcome, CheckoutOutcome::OrderCreated(order) if order.id == OrderId::Numeric(41)));
    assert_eq!(checkout.state()?, CheckoutState::OrderCreated(OrderId::Numeric(41)));
    assert_eq!(cart_len(&checkout)?, 0);

    let session = checkout.session().lock().map_err(|error| error.to_string())?;

    assert!(session.applied_voucher().is_none());

    Ok(())
}

#[tokio::test]
async fn server_discount_is_authoritative() -> TestResult {
    let mut vouchers = MockVoucherService::new();
    let mut orders = MockOrderService::new();
    let voucher = pet10()?;

    vouchers
        .expect_validate()
        .returning(move |_, _| Ok(accepted(voucher.clone(), Some(35_000))));
    orders
        .expect_create()
        .withf(|order: &CheckoutOrder| order.discount == 35_000 && order.total_amount == 465_000)
        .times(1)
        .returning(|_| Ok(created(42)));

    let checkout = orchestrator(session_with(vec![line(1, 250_000, 2)?])?, vouchers, orders);

    checkout.apply_voucher_code("PET10").await?;
    checkout.submit(&form(PaymentMethod::BankTransfer)).await?;

    Ok(())
}

#[tokio::test]
async fn redirect_keeps_cart_until_paid() -> TestResult {
    let mut orders = MockOrderService::new();

    orders.expect_create().never();
    orders
        .expect_create_gateway_session()
        .withf(|gateway: &Gateway, request: &GatewaySessionRequest| {
            *gateway == Gateway::VnPay && request.amount == 150_000 && request.order.is_some()
        })
        .times(1)
        .returning(|_, _| {
            Ok(GatewaySession {
                payment_url: Some("https://sandbox.vnpayment.vn/pay?ref=1".to_string()),
                ..GatewaySession::default()
            })
        });

    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        MockVoucherService::new(),
        orders,
    );

    let outcome = checkout.submit(&form(PaymentMethod::VnPay)).await?;

    assert!(matches!(
        outcome,
        CheckoutOutcome::Redirect { url } if url == "https://sandbox.vnpayment.vn/pay?ref=1"
    ));
    assert!(matches!(checkout.state()?, CheckoutState::RedirectPending { .. }));
    assert_eq!(cart_len(&checkout)?, 1);

    Ok(())
}

#[tokio::test]
async fn redirect_without_url_fails_and_keeps_cart() -> TestResult {
    let mut orders = MockOrderService::new();

    orders
        .expect_create_gateway_session()
        .returning(|_, _| Ok(GatewaySession::default()));

    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        MockVoucherService::new(),
        orders,
    );

    let error = checkout
        .submit(&form(PaymentMethod::VnPay))
        .await
        .err()
        .ok_or("expected a dispatch failure")?;

    assert_eq!(
        checkout.state()?,
        CheckoutState::Failed(error.user_message())
    );
    assert!(error.user_message().contains("payment link"));
    assert_eq!(cart_len(&checkout)?, 1);

    Ok(())
}

#[tokio::test]
async fn failed_order_keeps_cart_and_shows_server_message() -> TestResult {
    let mut vouchers = MockVoucherService::new();
    let mut orders = MockOrderService::new();
    let voucher = save20k()?;

    vouchers
        .expect_validate()
        .returning(move |_, _| Ok(accepted(voucher.clone(), None)));
    orders.expect_create().returning(|_| {
        Err(ApiError::Server {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "Product 1 is out of stock".to_string(),
        })
    });

    let checkout = orchestrator(session_with(vec![line(1, 150_000, 1)?])?, vouchers, orders);

    checkout.apply_voucher_code("SAVE20K").await?;

    let error = checkout
        .submit(&form(PaymentMethod::Cash))
        .await
        .err()
        .ok_or("expected the order to fail")?;

    assert_eq!(error.user_message(), "Product 1 is out of stock");
    assert_eq!(
        checkout.state()?,
        CheckoutState::Failed("Product 1 is out of stock".to_string())
    );

    let session = checkout.session().lock().map_err(|error| error.to_string())?;

    assert_eq!(session.items().len(), 1);
    assert!(session.applied_voucher().is_some());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn qr_countdown_expiry_leaves_order_alone() -> TestResult {
    let mut orders = MockOrderService::new();

    orders.expect_create().times(1).returning(|_| Ok(created(77)));
    orders
        .expect_create_gateway_session()
        .withf(|gateway: &Gateway, request: &GatewaySessionRequest| {
            *gateway == Gateway::Momo && request.order_id == Some(OrderId::Numeric(77))
        })
        .times(1)
        .returning(|_, _| {
            Ok(GatewaySession {
                qr_code: Some("momo://pay?order=77".to_string()),
                expires_in: Some(5),
                ..GatewaySession::default()
            })
        });

    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        MockVoucherService::new(),
        orders,
    );

    let CheckoutOutcome::QrPresented(session) = checkout.submit(&form(PaymentMethod::Momo)).await? else {
        return Err("expected a QR session".into());
    };

    assert_eq!(session.expires_in, Duration::from_secs(5));
    assert_eq!(cart_len(&checkout)?, 0);

    let mut countdown = session.countdown();

    assert_eq!(countdown.display(), "00:05");
    assert!(countdown.expired().await);
    assert_eq!(countdown.display(), "00:00");
    assert_eq!(checkout.state()?, CheckoutState::QrPresented(OrderId::Numeric(77)));

    Ok(())
}

#[tokio::test]
async fn qr_retry_reuses_the_created_order() -> TestResult {
    let mut orders = MockOrderService::new();
    let mut sessions = 0;

    orders.expect_create().times(1).returning(|_| Ok(created(55)));
    orders
        .expect_create_gateway_session()
        .withf(|_, request: &GatewaySessionRequest| request.order_id == Some(OrderId::Numeric(55)))
        .times(2)
        .returning(move |_, _| {
            sessions += 1;

            if sessions == 1 {
                return Ok(GatewaySession::default());
            }

            Ok(GatewaySession {
                qr_code: Some("momo://pay?order=55".to_string()),
                ..GatewaySession::default()
            })
        });

    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        MockVoucherService::new(),
        orders,
    );
    let form = form(PaymentMethod::Momo);

    let first = checkout.submit(&form).await;

    assert!(matches!(first, Err(CheckoutError::Dispatch(_))));
    assert_eq!(cart_len(&checkout)?, 1);

    let CheckoutOutcome::QrPresented(session) = checkout.submit(&form).await? else {
        return Err("expected a QR session on retry".into());
    };

    assert_eq!(session.order.id, OrderId::Numeric(55));
    assert_eq!(cart_len(&checkout)?, 0);

    Ok(())
}

#[tokio::test]
async fn changed_cart_after_qr_failure_places_a_new_order() -> TestResult {
    let mut orders = MockOrderService::new();
    let mut ids = 60;

    orders.expect_create().times(2).returning(move |_| {
        ids += 1;

        Ok(created(ids))
    });
    orders
        .expect_create_gateway_session()
        .returning(|_, _| Ok(GatewaySession::default()));

    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        MockVoucherService::new(),
        orders,
    );
    let form = form(PaymentMethod::Momo);

    checkout.submit(&form).await.err().ok_or("expected the qr session to fail")?;

    checkout
        .session()
        .lock()
        .map_err(|error| error.to_string())?
        .update_quantity(ProductId(1), 2)?;

    checkout.submit(&form).await.err().ok_or("expected the qr session to fail again")?;

    Ok(())
}

#[tokio::test]
async fn accepted_but_ineligible_voucher_is_not_applied() -> TestResult {
    let mut vouchers = MockVoucherService::new();
    let big = Voucher::new(
        VoucherCode::parse("BIG50K")?,
        VoucherKind::FixedAmount,
        Decimal::from(50_000),
    )
    .with_min_order(Decimal::from(200_000));
    let small = save20k()?;

    vouchers
        .expect_validate()
        .withf(|code, _| code.as_str() == "SAVE20K")
        .returning(move |_, _| Ok(accepted(small.clone(), None)));
    vouchers
        .expect_validate()
        .withf(|code, _| code.as_str() == "BIG50K")
        .returning(move |_, _| Ok(accepted(big.clone(), None)));

    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        vouchers,
        MockOrderService::new(),
    );

    checkout.apply_voucher_code("SAVE20K").await?;

    let error = checkout
        .apply_voucher_code("BIG50K")
        .await
        .err()
        .ok_or("expected the voucher to be ineligible")?;

    assert!(matches!(
        error,
        CheckoutError::Ineligible(Ineligibility::BelowMinimumOrder { .. })
    ));

    let session = checkout.session().lock().map_err(|error| error.to_string())?;

    assert_eq!(
        session.applied_voucher().map(|voucher| voucher.code.as_str()),
        Some("SAVE20K")
    );

    Ok(())
}

#[tokio::test]
async fn listed_voucher_applies_with_catalog_code() -> TestResult {
    let mut vouchers = MockVoucherService::new();
    let listed: Voucher = serde_json::from_value(serde_json::json!({
        "code": "TET.2026",
        "type": "fixed_amount",
        "value": 15000
    }))?;
    let returned = listed.clone();

    vouchers
        .expect_list_available()
        .returning(move |_| Ok(vec![returned.clone()]));
    vouchers
        .expect_validate()
        .withf(|code, _| code.as_str() == "TET.2026")
        .returning(|_, _| {
            Ok(VoucherValidation {
                valid: true,
                voucher: serde_json::from_value(serde_json::json!({
                    "code": "TET.2026",
                    "type": "fixed_amount",
                    "value": 15000
                }))
                .ok(),
                message: None,
                discount_amount: None,
            })
        });

    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        vouchers,
        MockOrderService::new(),
    );

    let available = checkout.available_vouchers().await?;
    let picked = available.first().ok_or("expected a listed voucher")?;

    assert_eq!(picked, &listed);

    let evaluation = checkout.apply_listed_voucher(picked).await?;

    assert_eq!(evaluation.discount, amount(15_000));

    Ok(())
}

/// Holds every create call until released.
#[derive(Debug, Clone, Default)]
struct GatedOrders {
    calls: Arc<AtomicUsize>,
    release: Arc<Notify>,
}

#[async_trait]
impl OrderService for GatedOrders {
    async fn create(&self, _order: &CheckoutOrder) -> Result<Order, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;

        Ok(created(99))
    }

    async fn create_gateway_session(
        &self,
        _gateway: Gateway,
        _request: &GatewaySessionRequest,
    ) -> Result<GatewaySession, ApiError> {
        Ok(GatewaySession::default())
    }
}

#[tokio::test]
async fn second_submit_while_in_flight_is_rejected() -> TestResult {
    let orders = GatedOrders::default();
    let checkout = orchestrator(
        session_with(vec![line(1, 150_000, 1)?])?,
        MockVoucherService::new(),
        orders.clone(),
    );
    let form = form(PaymentMethod::Cash);

    let (first, second) = tokio::join!(checkout.submit(&form), async {
        while orders.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let second = checkout.submit(&form).await;

        orders.release.notify_one();

        second
    });

    assert!(matches!(first?, CheckoutOutcome::OrderCreated(_)));
    assert!(matches!(second, Err(CheckoutError::AlreadySubmitting)));
    assert_eq!(orders.calls.load(Ordering::SeqCst), 1);
    assert_eq!(checkout.state()?, CheckoutState::OrderCreated(OrderId::Numeric(99)));

    Ok(())
}
