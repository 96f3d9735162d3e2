pub mod jwt;
pub mod mailer;
pub mod password;
