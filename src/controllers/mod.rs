pub mod home_controller;
pub mod monitor_controller;
pub mod conversations_controller;
pub mod realtime_controller;
