pub mod conversation;
pub mod intent;
pub mod order;
pub mod reply;
pub mod user;

pub use conversation::{ConversationTurn, Role};
pub use intent::{ExtractionResult, Intent, OrderReference};
pub use order::{Order, OrderItem, OrderSummary};
pub use reply::{Outcome, SupportReply};
pub use user::User;
