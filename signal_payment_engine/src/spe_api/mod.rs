pub mod payment_flow_api;
pub mod subscriber_api;
