//! Tailwag prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    api::{
        AddressLookup, ApiClient, ApiConfig, ApiError, AvailabilityService, Order, OrderId,
        OrderService, Region, VoucherService, VoucherValidation,
    },
    booking::{BookedTimeSet, BookingSlotAdvisor, ServiceId, SlotGrid, TimeSlot},
    cart::{Cart, CartError, CartLineItem, ProductId},
    checkout::{
        CheckoutError, CheckoutForm, CheckoutOrchestrator, CheckoutOrder, CheckoutOutcome,
        CheckoutState, ShippingAddress,
    },
    discount::{DiscountState, FileStore, MemoryStore, StateStore},
    money::{Amount, amount},
    payments::{
        DispatchFailure, DispatchResult, PaymentDispatcher, PaymentMethod, QrCountdown, QrSession,
    },
    pricing::{CartTotals, PricingError},
    receipt::{Receipt, ReceiptError},
    session::{CartSession, SessionError},
    vouchers::{Evaluation, Ineligibility, Voucher, VoucherCode, VoucherKind, evaluate},
};
