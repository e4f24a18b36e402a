pub mod alert_email;
pub mod dispatcher;
pub mod incidents;
pub mod profiles;
