// External service clients — image hosting, Cloud Vision, SerpApi, WebDriver.
//
// Each client implements one trait from `traits`, which is all the adapters
// depend on.

pub mod imgbb;
pub mod serpapi;
pub mod traits;
pub mod vision;
pub mod webdriver;
