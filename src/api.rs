pub mod analytics;
pub mod stats;
pub mod swagger_main;
pub mod task;
pub mod todo;
pub mod user;

#[cfg(test)]
pub mod test_util;
