pub mod db;
pub mod mailer;
pub mod queue;
pub mod store;
