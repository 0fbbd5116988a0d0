use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Coordinate, PlaceDescriptor, PlacesError, PlacesSearch, VendorRecord};
use crate::config::PlacesConfig;

const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,places.location,\
places.rating,places.priceLevel,places.types,places.regularOpeningHours.openNow,places.websiteUri";

const RESTAURANT_TYPE: &str = "restaurant";

// -- Wire types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbyRequest<'a> {
    included_types: [&'a str; 1],
    max_result_count: u32,
    location_restriction: Area,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextRequest<'a> {
    text_query: &'a str,
    included_type: &'a str,
    max_result_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_bias: Option<Area>,
}

#[derive(Debug, Serialize)]
struct Area {
    circle: Circle,
}

#[derive(Debug, Serialize)]
struct Circle {
    center: LatLng,
    radius: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalizedText {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHours {
    pub open_now: Option<bool>,
}

/// One result of a places search as returned on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub display_name: Option<LocalizedText>,
    pub formatted_address: Option<String>,
    pub location: Option<LatLng>,
    pub rating: Option<f64>,
    pub price_level: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    pub regular_opening_hours: Option<OpeningHours>,
    pub website_uri: Option<String>,
}

impl Place {
    pub(super) fn into_descriptor(self, fallback: Coordinate) -> PlaceDescriptor {
        let location = self
            .location
            .map(|l| Coordinate::new(l.latitude, l.longitude))
            .unwrap_or(fallback);
        PlaceDescriptor {
            id: self.id,
            name: self
                .display_name
                .map(|n| n.text)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown Restaurant".to_string()),
            address: self
                .formatted_address
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "Address not available".to_string()),
            location,
            rating: self.rating,
            price_level: self.price_level.as_deref().and_then(price_tier),
            types: self.types,
            is_open: self.regular_opening_hours.and_then(|h| h.open_now),
            website: self.website_uri,
        }
    }
}

fn price_tier(level: &str) -> Option<u8> {
    match level {
        "PRICE_LEVEL_FREE" => Some(0),
        "PRICE_LEVEL_INEXPENSIVE" => Some(1),
        "PRICE_LEVEL_MODERATE" => Some(2),
        "PRICE_LEVEL_EXPENSIVE" => Some(3),
        "PRICE_LEVEL_VERY_EXPENSIVE" => Some(4),
        _ => None,
    }
}

// -- Client --

#[derive(Clone)]
pub struct GooglePlacesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    nearby_max_results: u32,
    text_max_results: u32,
    text_bias_radius_m: f64,
}

impl GooglePlacesClient {
    pub fn new(config: &PlacesConfig) -> Result<Self, PlacesError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            nearby_max_results: config.nearby_max_results,
            text_max_results: config.text_max_results,
            text_bias_radius_m: config.text_bias_radius_m,
        })
    }

    async fn post_search<B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Vec<Place>, PlacesError> {
        let api_key = self.api_key.as_deref().ok_or(PlacesError::NotConfigured)?;

        let response = self
            .http
            .post(format!("{}/v1/places:{}", self.base_url, endpoint))
            .header("X-Goog-Api-Key", api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(body)
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

        let data: SearchResponse = response.json().await?;
        Ok(data.places)
    }
}

#[async_trait]
impl PlacesSearch for GooglePlacesClient {
    async fn search_nearby(
        &self,
        center: Coordinate,
        radius_m: f64,
    ) -> Result<Vec<PlaceDescriptor>, PlacesError> {
        tracing::debug!(lat = center.lat, lng = center.lng, radius_m, "Nearby restaurant search");

        let body = NearbyRequest {
            included_types: [RESTAURANT_TYPE],
            max_result_count: self.nearby_max_results,
            location_restriction: Area {
                circle: Circle {
                    center: LatLng {
                        latitude: center.lat,
                        longitude: center.lng,
                    },
                    radius: radius_m,
                },
            },
        };

        let places = self.post_search("searchNearby", &body).await?;
        Ok(places
            .into_iter()
            .map(|place| {
                VendorRecord::Places {
                    place,
                    fallback: center,
                }
                .into_descriptor()
            })
            .collect())
    }

    async fn search_text(
        &self,
        query: &str,
        bias: Option<Coordinate>,
    ) -> Result<Vec<PlaceDescriptor>, PlacesError> {
        tracing::debug!(query, ?bias, "Text restaurant search");

        let body = TextRequest {
            text_query: query,
            included_type: RESTAURANT_TYPE,
            max_result_count: self.text_max_results,
            location_bias: bias.map(|c| Area {
                circle: Circle {
                    center: LatLng {
                        latitude: c.lat,
                        longitude: c.lng,
                    },
                    radius: self.text_bias_radius_m,
                },
            }),
        };

        let fallback = bias.unwrap_or(Coordinate::new(0.0, 0.0));
        let places = self.post_search("searchText", &body).await?;
        Ok(places
            .into_iter()
            .map(|place| VendorRecord::Places { place, fallback }.into_descriptor())
            .collect())
    }
}
