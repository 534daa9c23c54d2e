pub mod booking;
pub mod centre;
pub mod event;
pub mod operating_hours;
pub mod refund;
pub mod search;

pub use booking::{Booking, BookingStatus, NewBooking, TransitionContext};
pub use centre::{Centre, CentreStatus, Locality, Service};
pub use event::{BookingEvent, BookingEventKind};
pub use operating_hours::{DayHours, HoursViolation, OperatingHours};
pub use refund::{RefundQuote, RefundTier};
pub use search::{LocalityFilter, Pagination, SearchFilters, SearchResult};
