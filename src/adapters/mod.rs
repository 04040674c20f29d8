// Backend adapters — one per reverse-image-search backend.
//
// Each adapter gets raw data from its collaborator clients, wraps it in a
// RawUpstreamPayload and hands it to the normalizer.

pub mod aggregator;
pub mod calibration;
pub mod cloud_vision;
pub mod scraped;
pub mod selector;
pub mod traits;

use tracing::{info, warn};

use crate::clients::traits::ImageHost;
use crate::error::ScanError;

/// Upload through the image host, turning both failure modes into `Upload`.
///
/// Without a public URL neither SerpApi nor Lens can be queried, so this is
/// always fatal to the calling adapter.
pub(crate) async fn upload_image(
    host: &dyn ImageHost,
    image: &[u8],
    api_key: &str,
) -> Result<String, ScanError> {
    match host.upload(image, api_key).await {
        Ok(Some(url)) => {
            info!(url = %url, "Image hosted");
            Ok(url)
        }
        Ok(None) => {
            warn!("Image host reported an unsuccessful upload");
            Err(ScanError::Upload(
                "image host did not return a public URL".to_string(),
            ))
        }
        Err(e) => {
            warn!(error = %e, "Image host unreachable");
            Err(ScanError::Upload(format!("{e:#}")))
        }
    }
}
