pub mod handlers;
pub mod openapi;
pub mod validators;

pub const APP_TITLE: &str = "Webhook Delivery API";
