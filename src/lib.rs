// scanlens: identify objects in a photo via reverse image search
//
// This is the library root. Three backends (Cloud Vision, SerpApi, scraped
// Google Lens) are normalized into one CommonResult; the dispatcher picks
// the backend per request.

pub mod adapters;
pub mod clients;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod keywords;
pub mod output;
pub mod payload;
pub mod result;

#[cfg(feature = "web")]
pub mod web;

pub use dispatch::{Credentials, Method, Scanner};
pub use error::ScanError;
pub use result::CommonResult;
