pub mod email_service;
pub mod notify;
pub mod otp_service;
pub mod recovery_service;
pub mod sms_service;
pub mod token_service;
