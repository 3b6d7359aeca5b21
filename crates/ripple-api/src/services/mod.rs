// Services layer for read-side business logic
// Services own limits and pagination, calling the EventStore directly

pub mod feed;
pub mod notification;

pub use feed::{FeedPage, FeedService};
pub use notification::{NotificationList, NotificationService};
