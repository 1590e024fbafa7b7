use crate::http::HttpClient;
use crate::resource::{FallbackPolicy, Fetcher, Resource};
use crate::types::{Coordinates, SoilAnalysis};
use crate::Error;
use async_trait::async_trait;

/// Soil analysis served by the dashboard backend.
pub struct SoilClient {
    http: HttpClient,
}

impl SoilClient {
    #[must_use]
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Fetches the soil analysis for a location.
    ///
    /// # Errors
    /// Returns an error if the request fails, the backend reports an
    /// `error`, or the payload is not a soil analysis.
    pub async fn analysis(&self, coords: Coordinates) -> Result<SoilAnalysis, Error> {
        self.http
            .get_with_query(
                "soil-analysis",
                &[("lat", coords.lat.to_string()), ("lon", coords.lon.to_string())],
            )
            .await
    }
}

#[async_trait]
impl Fetcher for SoilClient {
    type Params = Coordinates;
    type Output = SoilAnalysis;

    fn name(&self) -> &'static str {
        "soil"
    }

    async fn fetch(&self, coords: &Coordinates) -> Result<SoilAnalysis, Error> {
        self.analysis(*coords).await
    }
}

/// Soil clears its data on failure and surfaces the message.
pub type SoilResource = Resource<SoilClient>;

impl SoilResource {
    #[must_use]
    pub fn soil(client: SoilClient) -> Self {
        Self::new(client, FallbackPolicy::ClearOnError)
    }
}
