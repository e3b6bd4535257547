pub mod api;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod hub;
pub mod icons;
pub mod scheduler;
pub mod sensors;
pub mod view;
pub mod weather;

#[cfg(test)]
mod test_support;
