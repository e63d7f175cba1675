//! Data models for Hearth

mod member;
mod record;
mod task;

pub use member::{palette_color, Member, MEMBER_PALETTE};
pub(crate) use record::parse_positive_millis;
pub use record::Record;
pub use task::{recurring_dates, Recurrence, Task, TASK_DATE_FORMAT};
