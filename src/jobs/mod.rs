pub mod notify_worker;
