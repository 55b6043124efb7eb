//! Weekly lesson recurrence: course lifetime, partnership ownership,
//! cancellations and next-lesson resolution. Everything here is pure; the
//! service layer loads the inputs inside a transaction.

pub mod cancellations;
pub mod lifecycle;
pub mod partnership;
pub mod resolver;

pub use cancellations::CancellationLedger;
pub use resolver::{OccurrenceState, Participant};
