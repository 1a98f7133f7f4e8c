//! Aggregation services
//!
//! Each service fetches what it needs through a [`crate::store::RecordStore`]
//! and shapes the flat records into the view models served by the API. The
//! pure grouping functions are public so they can be tested without a store.

pub mod catalogue;
pub mod content;
pub mod episodes;
pub mod grouping;
pub mod history;
pub mod profiles;
pub mod similarity;
