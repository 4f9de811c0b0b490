pub mod devices;
pub mod stores;
pub mod workers;
