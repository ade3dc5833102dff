pub mod bus;
pub mod config;
pub mod model;
pub mod page;
pub mod persist;
pub mod serialization;
pub mod view;

#[cfg(test)]
mod test_support;
