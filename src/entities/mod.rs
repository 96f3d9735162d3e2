pub mod car;
pub mod car_submission;
pub mod status;
pub mod test_drive_request;
pub mod user;

pub use status::ReviewStatus;
