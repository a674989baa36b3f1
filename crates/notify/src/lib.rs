//! `savx-notify` — fire-and-forget order notifications.

pub mod dispatcher;

pub use dispatcher::{
    dispatch_order_placed, dispatch_status_changed, LogNotifier, NotifyError, OrderNotifier,
    OrderSummary, RecordingNotifier, SummaryLine,
};
