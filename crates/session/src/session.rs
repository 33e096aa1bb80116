use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use till_core::{Aggregate, CartId, DomainError, DomainResult, ProductId, Sequence};
use till_events::{EventBus, InMemoryEventBus, Subscription};
use till_notifications::{DismissScheduler, MessageEntry, NotificationBus};
use till_products::Product;
use till_sales::{Cart, CartCommand, CartEvent, CartLine, CheckoutLine};

use crate::config::SessionConfig;

/// Read-only view of the cart for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub id: CartId,
    pub lines: Vec<CartLine>,
    pub locked: bool,
    pub item_count: u64,
    pub sub_total: f64,
    pub total: f64,
}

/// Everything the presentation layer renders, in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub cart: CartSnapshot,
    pub messages: Vec<MessageEntry>,
}

/// One till session: a cart, its notifications and the checkout flow.
///
/// Cart failures never propagate out of the session. They are recorded as
/// `InvalidInput` notifications for the operator instead.
#[derive(Debug)]
pub struct PosSession<S> {
    cart: Cart,
    notifications: NotificationBus<S>,
    cart_changes: InMemoryEventBus<CartEvent>,
    config: SessionConfig,
}

impl<S: DismissScheduler> PosSession<S> {
    pub fn new(config: SessionConfig, scheduler: S) -> Self {
        let notifications =
            NotificationBus::new(scheduler).with_success_dismiss(config.success_dismiss);

        Self {
            cart: Cart::new(),
            notifications,
            cart_changes: InMemoryEventBus::new(),
            config,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn notifications(&self) -> &NotificationBus<S> {
        &self.notifications
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Stream of applied cart events.
    pub fn subscribe_cart(&self) -> Subscription<CartEvent> {
        self.cart_changes.subscribe()
    }

    /// Run a cart command. Returns whether it was accepted.
    pub fn execute(&mut self, command: CartCommand) -> bool {
        let result = self.cart.execute(&command);
        self.record(result)
    }

    pub fn add_item(&mut self, product: &Product, quantity: u32) -> bool {
        let result = self.cart.add_item(product, quantity);
        self.record(result)
    }

    pub fn remove_item(&mut self, product_id: ProductId, quantity: Option<u32>) -> bool {
        let result = self.cart.remove_item(product_id, quantity);
        self.record(result)
    }

    pub fn clear_cart(&mut self) -> bool {
        let result = self.cart.clear();
        self.record(result)
    }

    /// Publish applied events, or turn a refusal into a notice.
    fn record(&self, result: DomainResult<Vec<CartEvent>>) -> bool {
        match result {
            Ok(events) => {
                for event in events {
                    debug!(event = ?event, "cart event applied");
                    if let Err(err) = self.cart_changes.publish(event) {
                        warn!(error = %err, "failed to publish cart change");
                    }
                }
                true
            }
            Err(err) => {
                self.refuse(err);
                false
            }
        }
    }

    /// Lock the cart and hand back the lines to charge for.
    ///
    /// Refused (with a notice) when the cart is empty or already locked.
    pub fn begin_checkout(&mut self) -> Option<Vec<CheckoutLine>> {
        if self.cart.is_locked() {
            self.refuse(DomainError::conflict("checkout already in progress"));
            return None;
        }
        if self.cart.is_empty() {
            self.refuse(DomainError::validation("cart is empty"));
            return None;
        }

        let result = self.cart.lock();
        if !self.record(result) {
            return None;
        }

        info!(
            cart_id = %self.cart.id_typed(),
            lines = self.cart.lines().len(),
            total = self.cart.total(),
            "checkout started"
        );
        Some(self.cart.checkout_lines())
    }

    /// Abandon the checkout and make the cart editable again.
    pub fn cancel_checkout(&mut self) -> bool {
        if !self.cart.is_locked() {
            return false;
        }
        info!(cart_id = %self.cart.id_typed(), "checkout cancelled");
        let result = self.cart.unlock();
        self.record(result)
    }

    /// Finish the sale: empty the cart, unlock it and confirm to the operator.
    ///
    /// Returns the amount charged, or `None` when no checkout is in progress.
    pub fn complete_sale(&mut self) -> Option<f64> {
        if !self.cart.is_locked() {
            self.refuse(DomainError::invariant("no checkout in progress"));
            return None;
        }

        let total = self.cart.total();
        let cleared = self.cart.clear();
        self.record(cleared);
        let unlocked = self.cart.unlock();
        self.record(unlocked);

        info!(cart_id = %self.cart.id_typed(), total, "sale completed");
        self.notifications
            .add_success(format!("Sale completed: {total:.2}"));
        Some(total)
    }

    /// Record a failure reported by a collaborator (backend call, printer, ...).
    pub fn report_failure<P>(&self, payload: &P) -> Sequence
    where
        P: Serialize + ?Sized,
    {
        let sequence = self.notifications.add_unknown_error(payload);
        warn!(%sequence, "failure reported");
        sequence
    }

    pub fn dismiss(&self, sequence: Sequence) -> bool {
        self.notifications.remove_message(sequence)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            cart: CartSnapshot {
                id: self.cart.id_typed(),
                lines: self.cart.lines().to_vec(),
                locked: self.cart.is_locked(),
                item_count: self.cart.item_count(),
                sub_total: self.cart.sub_total(),
                total: self.cart.total(),
            },
            messages: self.notifications.entries(),
        }
    }

    /// Surface a refused operation as an invalid-input notice.
    pub(crate) fn refuse(&self, err: DomainError) {
        warn!(error = %err, "operation refused");
        self.notifications
            .add_invalid_input(err.to_string(), self.config.invalid_input_dismiss);
    }
}
