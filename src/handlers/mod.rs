//! Message handlers and presets for the site's live feeds.
//!
//! Each feed shares the same resilient client and only supplies its options
//! and a [`MessageHandler`](crate::messaging::MessageHandler).
pub mod airdrops;
pub mod notifications;
pub mod scan;

pub use airdrops::{AirdropHandler, airdrop_options};
pub use notifications::{NotificationHandler, notification_options};
pub use scan::{ScanHandler, ScanProgress, scan_options};
