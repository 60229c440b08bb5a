pub mod capability;
pub mod driver;
