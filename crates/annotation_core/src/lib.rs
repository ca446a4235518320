//! Trajectory annotation core: an ordered, timestamp-monotonic point store, the
//! simulated clock that stamps new points, the training/testing mode machine,
//! viewport synchronization, and the session coordinating them.

pub mod backend;
pub mod driver;
pub mod error;
pub mod mode;
pub mod session;
pub mod store;
pub mod time_cursor;
pub mod timers;
pub mod viewport;

pub use backend::{CourseBackend, HttpCourseBackend};
pub use driver::SessionDriver;
pub use error::{AnnotationError, ErrorKind, Mutation};
pub use session::{AnnotationSession, Outcome, SessionSettings, SessionSnapshot};
pub use store::{Point, TemporalPointStore};
pub use time_cursor::{CursorStatus, IncrementUnit, TimeCursor};
