use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub order_id: i64,
    pub user_id: i64,
    pub status: String,
    pub date_purchase: String,
    pub date_shipped: Option<String>,
    pub date_delivered: Option<String>,
    pub payment_status: String,
    pub items: Vec<OrderItem>,
}

/// One line of the order history handed to the extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    pub order_id: i64,
    pub status: String,
    pub date_purchase: String,
}

impl OrderSummary {
    pub fn to_prompt_line(&self) -> String {
        format!(
            "- order_id: {}, status: {}, purchased: {}",
            self.order_id, self.status, self.date_purchase
        )
    }
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            status: order.status.clone(),
            date_purchase: order.date_purchase.clone(),
        }
    }
}
