pub mod admin;
pub mod auth;
pub mod cars;
pub mod submissions;
pub mod test_drives;
pub mod users;
