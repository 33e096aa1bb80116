//! Line-oriented JSON requests, one per cashier action.
//!
//! ```text
//! {"op":"add_item","product":{"id":1,"name":"Polenta","price":4.5,"category":"Cibo"}}
//! {"op":"remove_item","product_id":1,"quantity":1}
//! {"op":"begin_checkout"}
//! {"op":"complete_sale"}
//! {"op":"dismiss","sequence":0}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use till_core::{ProductId, Sequence};
use till_notifications::DismissScheduler;
use till_products::Product;

use crate::session::PosSession;

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SessionRequest {
    AddItem {
        product: Product,
        #[serde(default = "one")]
        quantity: u32,
    },
    RemoveItem {
        product_id: ProductId,
        #[serde(default)]
        quantity: Option<u32>,
    },
    Clear,
    BeginCheckout,
    CancelCheckout,
    CompleteSale,
    Dismiss {
        sequence: Sequence,
    },
    ClearMessages,
    ReportFailure {
        payload: Value,
    },
    /// Change nothing; the caller just wants the current state.
    Snapshot,
}

impl<S: DismissScheduler> PosSession<S> {
    /// Apply one request. Refusals end up as notifications, never as errors.
    pub fn handle_request(&mut self, request: SessionRequest) {
        match request {
            SessionRequest::AddItem { product, quantity } => {
                self.add_item(&product, quantity);
            }
            SessionRequest::RemoveItem {
                product_id,
                quantity,
            } => {
                self.remove_item(product_id, quantity);
            }
            SessionRequest::Clear => {
                self.clear_cart();
            }
            SessionRequest::BeginCheckout => {
                self.begin_checkout();
            }
            SessionRequest::CancelCheckout => {
                self.cancel_checkout();
            }
            SessionRequest::CompleteSale => {
                self.complete_sale();
            }
            SessionRequest::Dismiss { sequence } => {
                self.dismiss(sequence);
            }
            SessionRequest::ClearMessages => self.notifications().clear_messages(),
            SessionRequest::ReportFailure { payload } => {
                self.report_failure(&payload);
            }
            SessionRequest::Snapshot => {}
        }
    }

    /// Parse and apply one raw request line. Unreadable input becomes an
    /// invalid-input notice.
    pub fn handle_line(&mut self, line: &str) {
        match serde_json::from_str::<SessionRequest>(line) {
            Ok(request) => self.handle_request(request),
            Err(err) => {
                self.notifications().add_invalid_input(
                    format!("unreadable request: {err}"),
                    self.config().invalid_input_dismiss,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_item_quantity_defaults_to_one() {
        let request: SessionRequest = serde_json::from_value(json!({
            "op": "add_item",
            "product": {"id": 1, "name": "Polenta", "price": 4.5, "category": "Cibo"}
        }))
        .unwrap();

        match request {
            SessionRequest::AddItem { product, quantity } => {
                assert_eq!(product.id, ProductId::new(1));
                assert_eq!(quantity, 1);
            }
            _ => panic!("Expected AddItem request"),
        }
    }

    #[test]
    fn unit_requests_parse_from_op_alone() {
        let request: SessionRequest =
            serde_json::from_value(json!({"op": "begin_checkout"})).unwrap();
        assert_eq!(request, SessionRequest::BeginCheckout);

        let request: SessionRequest =
            serde_json::from_value(json!({"op": "remove_item", "product_id": 3})).unwrap();
        assert_eq!(
            request,
            SessionRequest::RemoveItem {
                product_id: ProductId::new(3),
                quantity: None
            }
        );
    }
}
