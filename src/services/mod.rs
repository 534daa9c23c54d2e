pub mod calendar;
pub mod cancellation;
pub mod lifecycle;
pub mod messaging;
pub mod notifications;
pub mod scheduling;
pub mod search;
pub mod store;
