pub mod agent;
#[cfg(feature = "chrome")]
pub mod chrome;
pub mod driver;

pub use agent::BrowserWebAgent;
#[cfg(feature = "chrome")]
pub use chrome::ChromeBrowser;
pub use driver::Driver;
