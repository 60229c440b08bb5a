//! Driver layer for browser automation.
//!
//! This crate defines the capability contract the extraction agent consumes
//! and the WebDriver implementation used in production.
//!
//! - [`BrowserCapabilities`]: navigate / click / fill / rendered markup
//! - [`ToolError`] and [`ErrorCode`]: typed failures of those primitives
//! - [`WebDriverSession`]: `fantoccini`-backed session against Chromedriver
pub mod gleaner_browser;

pub use gleaner_browser::capability::{BrowserCapabilities, ErrorCode, Navigation, ToolError};
pub use gleaner_browser::driver::{DriverOptions, WebDriverSession};
