use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{Coordinate, Geocoder, PlaceDescriptor, PlacesError, VendorRecord};
use crate::config::GeocodingConfig;

#[derive(Debug, Default, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureProperties {
    pub address: Option<String>,
    pub category: Option<String>,
}

/// A geocoding feature. `center` is `[lng, lat]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub place_name: String,
    pub text: Option<String>,
    pub center: Option<[f64; 2]>,
    pub properties: Option<FeatureProperties>,
}

impl Feature {
    pub(super) fn into_descriptor(self) -> PlaceDescriptor {
        let location = self
            .center
            .map(|[lng, lat]| Coordinate::new(lat, lng))
            .unwrap_or(Coordinate::new(0.0, 0.0));
        let name = self
            .text
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.place_name.clone());
        let mut descriptor = PlaceDescriptor::basic(self.id, name, self.place_name, location);
        if let Some(category) = self.properties.and_then(|p| p.category) {
            descriptor.types = category.split(',').map(|c| c.trim().to_string()).collect();
        }
        descriptor
    }
}

#[derive(Clone)]
pub struct MapboxGeocoder {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    search_limit: u32,
}

impl MapboxGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self, PlacesError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            access_token: config.access_token.clone(),
            search_limit: config.search_limit,
        })
    }

    fn endpoint(&self, query: &str) -> Result<url::Url, PlacesError> {
        let mut url = url::Url::parse(&self.base_url)?;
        let resource = format!("{}.json", query);
        url.path_segments_mut()
            .map_err(|_| PlacesError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(["geocoding", "v5", "mapbox.places", resource.as_str()]);
        Ok(url)
    }

    async fn fetch(
        &self,
        query: &str,
        extra: &[(&str, String)],
    ) -> Result<Vec<Feature>, PlacesError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(PlacesError::NotConfigured)?;

        let response = self
            .http
            .get(self.endpoint(query)?)
            .query(&[("access_token", token)])
            .query(extra)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlacesError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: FeatureCollection = response.json().await?;
        Ok(data.features)
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn reverse(&self, point: Coordinate) -> Result<Vec<PlaceDescriptor>, PlacesError> {
        let query = format!("{},{}", point.lng, point.lat);
        let features = self.fetch(&query, &[]).await?;
        Ok(features
            .into_iter()
            .map(|f| VendorRecord::Geocoding(f).into_descriptor())
            .collect())
    }

    async fn search(&self, query: &str) -> Result<Vec<PlaceDescriptor>, PlacesError> {
        let extra = [
            ("types", "poi".to_string()),
            ("limit", self.search_limit.to_string()),
        ];
        let features = self.fetch(query, &extra).await?;
        Ok(features
            .into_iter()
            .map(|f| VendorRecord::Geocoding(f).into_descriptor())
            .collect())
    }
}
