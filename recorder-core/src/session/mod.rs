pub mod capture;
pub mod controller;
pub mod recorder;
pub mod stop_token;
