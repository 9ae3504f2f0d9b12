use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    OrderInfo,
    OrderHelp,
    OutOfScope,
}

impl Intent {
    pub const ALL: [Intent; 3] = [Intent::OrderInfo, Intent::OrderHelp, Intent::OutOfScope];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::OrderInfo => "ORDER_INFO",
            Intent::OrderHelp => "ORDER_HELP",
            Intent::OutOfScope => "OUT_OF_SCOPE",
        }
    }

    /// Exact label match only.
    pub fn from_label(label: &str) -> Option<Self> {
        Intent::ALL.into_iter().find(|i| i.as_str() == label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderReference {
    Id(i64),
    Latest,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionResult {
    pub order: Option<OrderReference>,
    pub needs_clarification: bool,
}

impl ExtractionResult {
    pub fn clarify() -> Self {
        Self {
            order: None,
            needs_clarification: true,
        }
    }

    pub fn resolved(order: OrderReference) -> Self {
        Self {
            order: Some(order),
            needs_clarification: false,
        }
    }

    pub fn order_id(&self) -> Option<i64> {
        match self.order {
            Some(OrderReference::Id(id)) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_exactly() {
        for intent in Intent::ALL {
            assert_eq!(Intent::from_label(intent.as_str()), Some(intent));
        }
        assert_eq!(Intent::from_label("order_info"), None);
        assert_eq!(Intent::from_label("ORDER"), None);
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Intent::OutOfScope).unwrap();
        assert_eq!(json, "\"OUT_OF_SCOPE\"");
    }

    #[test]
    fn test_latest_has_no_order_id() {
        assert_eq!(ExtractionResult::resolved(OrderReference::Latest).order_id(), None);
        assert_eq!(ExtractionResult::resolved(OrderReference::Id(7)).order_id(), Some(7));
    }
}
