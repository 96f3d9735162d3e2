//! Outbound email. Delivery is not wired to a provider; messages are
//! recorded as structured log events only.

use chrono::{DateTime, Utc};

use crate::entities::user::OtpType;

pub fn send_otp(email: &str, code: &str, otp_type: OtpType, expires_at: DateTime<Utc>) {
    tracing::info!(
        email = %email,
        otp_type = ?otp_type,
        expires_at = %expires_at,
        "OTP email queued (delivery stubbed)"
    );
    tracing::debug!(email = %email, code = %code, "OTP code");
}
