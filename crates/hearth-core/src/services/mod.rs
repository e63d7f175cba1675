//! Service layer shared by Hearth clients.

mod household;

pub use household::HouseholdService;
