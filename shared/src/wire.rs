use serde::Deserialize;
use serde_json::Value;

use crate::entity::{Entity, EntityId, ForecastPoint, LatLng, PopulationRange};
use crate::error::{CoordinateError, IngestError, ItemError};
use crate::format::{parse_timestamp, timestamp_from_epoch};
use crate::level::CrowdLevel;

/// Which backend contract the fetcher talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiContract {
    /// `GET /congestion?include_fcst=true` -> `{ ok, items }`.
    #[default]
    Congestion,
    /// `GET /tourist-spots` -> bare array or `{ spots }`.
    Legacy,
}

impl ApiContract {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Congestion => "/congestion?include_fcst=true",
            Self::Legacy => "/tourist-spots",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "congestion" => Some(Self::Congestion),
            "legacy" | "tourist-spots" => Some(Self::Legacy),
            _ => None,
        }
    }
}

/// A JSON field the service sends either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn as_finite(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    fn as_count(&self) -> i64 {
        self.as_finite().map(|v| v.round() as i64).unwrap_or(0)
    }
}

/// One item of the congestion endpoint, read leniently.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub area_cd: Option<Scalar>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lat: Option<Scalar>,
    #[serde(default)]
    pub lon: Option<Scalar>,
    #[serde(default)]
    pub area_congest_lvl: Option<String>,
    #[serde(default)]
    pub area_ppltn_min: Option<Scalar>,
    #[serde(default)]
    pub area_ppltn_max: Option<Scalar>,
    #[serde(default)]
    pub updated_at: Option<Scalar>,
    /// Kept as a value so a broken forecast never rejects the whole item.
    #[serde(default)]
    pub fcst: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawForecast {
    #[serde(default)]
    fcst_time: Option<Scalar>,
    #[serde(default)]
    fcst_congest_lvl: Option<String>,
    #[serde(default)]
    fcst_ppltn_min: Option<Scalar>,
    #[serde(default)]
    fcst_ppltn_max: Option<Scalar>,
}

/// Older tourist-spot record: `title` and string-encoded `mapx`/`mapy`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacySpot {
    #[serde(default, alias = "content_id")]
    pub contentid: Option<Scalar>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub mapx: Option<Scalar>,
    #[serde(default)]
    pub mapy: Option<Scalar>,
}

impl From<LegacySpot> for RawItem {
    fn from(spot: LegacySpot) -> Self {
        Self {
            area_cd: spot.contentid,
            name: spot.title,
            lat: spot.mapy,
            lon: spot.mapx,
            ..Self::default()
        }
    }
}

fn coordinate(field: &'static str, value: Option<&Scalar>) -> Result<f64, CoordinateError> {
    value
        .and_then(Scalar::as_finite)
        .ok_or_else(|| CoordinateError {
            field,
            value: value.map(Scalar::as_text).unwrap_or_default(),
        })
}

impl RawItem {
    /// Validate and normalize into a store entity.
    pub fn into_entity(self) -> Result<Entity, ItemError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ItemError::MissingName)?
            .to_string();
        let lat = coordinate("lat", self.lat.as_ref())?;
        let lng = coordinate("lon", self.lon.as_ref())?;
        let position = LatLng::new(lat, lng);

        let code = self.area_cd.as_ref().map(Scalar::as_text);
        let id = EntityId::derive(code.as_deref(), &name, position);

        let updated_at = match &self.updated_at {
            Some(Scalar::Number(n)) => timestamp_from_epoch(*n),
            Some(Scalar::Text(s)) => parse_timestamp(s),
            None => None,
        };

        Ok(Entity {
            id,
            name,
            position,
            level: CrowdLevel::new(self.area_congest_lvl.unwrap_or_default()),
            population: PopulationRange {
                min: self.area_ppltn_min.as_ref().map_or(0, Scalar::as_count),
                max: self.area_ppltn_max.as_ref().map_or(0, Scalar::as_count),
            },
            updated_at,
            forecast: parse_forecast(self.fcst.as_ref()),
        })
    }
}

fn parse_forecast(value: Option<&Value>) -> Vec<ForecastPoint> {
    let Some(points) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    points
        .iter()
        .filter_map(|point| serde_json::from_value::<RawForecast>(point.clone()).ok())
        .map(|point| ForecastPoint {
            time: point.fcst_time.as_ref().map(Scalar::as_text).unwrap_or_default(),
            level: CrowdLevel::new(point.fcst_congest_lvl.unwrap_or_default()),
            population: PopulationRange {
                min: point.fcst_ppltn_min.as_ref().map_or(0, Scalar::as_count),
                max: point.fcst_ppltn_max.as_ref().map_or(0, Scalar::as_count),
            },
        })
        .collect()
}

fn read_item(value: &Value) -> Result<RawItem, ItemError> {
    if !value.is_object() {
        return Err(ItemError::NotARecord(value.to_string()));
    }
    serde_json::from_value(value.clone()).map_err(|e| ItemError::NotARecord(e.to_string()))
}

fn read_legacy(value: &Value) -> Result<RawItem, ItemError> {
    if !value.is_object() {
        return Err(ItemError::NotARecord(value.to_string()));
    }
    serde_json::from_value::<LegacySpot>(value.clone())
        .map(RawItem::from)
        .map_err(|e| ItemError::NotARecord(e.to_string()))
}

/// Check the envelope and split it into per-item records.
/// Envelope problems reject the whole payload; item problems are per item.
pub fn parse_payload(
    body: &Value,
    contract: ApiContract,
) -> Result<Vec<Result<RawItem, ItemError>>, IngestError> {
    match contract {
        ApiContract::Congestion => {
            let Some(envelope) = body.as_object() else {
                return Err(IngestError::MalformedPayload(
                    "response is not an object".into(),
                ));
            };
            match envelope.get("ok").and_then(Value::as_bool) {
                Some(true) => {}
                Some(false) => return Err(IngestError::MalformedPayload("ok=false".into())),
                None => {
                    return Err(IngestError::MalformedPayload(
                        "missing success flag".into(),
                    ));
                }
            }
            let Some(items) = envelope.get("items").and_then(Value::as_array) else {
                return Err(IngestError::MalformedPayload(
                    "items is not a collection".into(),
                ));
            };
            Ok(items.iter().map(read_item).collect())
        }
        ApiContract::Legacy => {
            let spots = body
                .as_array()
                .or_else(|| body.get("spots").and_then(Value::as_array))
                .ok_or_else(|| IngestError::MalformedPayload("spots is not an array".into()))?;
            Ok(spots.iter().map(read_legacy).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::level::LevelKind;

    #[test]
    fn rejects_bad_envelopes() {
        for body in [
            json!({ "ok": false }),
            json!({ "items": [] }),
            json!({ "ok": true, "items": {} }),
            json!([1, 2, 3]),
        ] {
            let err = parse_payload(&body, ApiContract::Congestion).unwrap_err();
            assert!(matches!(err, IngestError::MalformedPayload(_)), "{body}");
        }
    }

    #[test]
    fn reads_string_and_number_coordinates() {
        let body = json!({
            "ok": true,
            "items": [
                { "name": "A", "lat": "37.5", "lon": "127.0", "area_congest_lvl": "여유" },
                { "name": "B", "lat": 37.6, "lon": 126.9, "area_congest_lvl": "붐빔",
                  "area_cd": "POI002", "area_ppltn_min": 1200, "area_ppltn_max": "1,400" }
            ]
        });
        let items = parse_payload(&body, ApiContract::Congestion).unwrap();
        let entities: Vec<Entity> = items
            .into_iter()
            .map(|item| item.unwrap().into_entity().unwrap())
            .collect();

        assert_eq!(entities[0].id.as_str(), "A@37.5,127");
        assert_eq!(entities[0].position, LatLng::new(37.5, 127.0));
        assert_eq!(entities[0].population, PopulationRange::default());
        assert_eq!(entities[1].id.as_str(), "POI002");
        assert_eq!(entities[1].level.kind(), LevelKind::Crowded);
        assert_eq!(entities[1].population, PopulationRange { min: 1200, max: 1400 });
    }

    #[test]
    fn non_numeric_coordinate_is_a_coordinate_error() {
        let item: RawItem =
            serde_json::from_value(json!({ "name": "X", "lat": "abc", "lon": "127.0" })).unwrap();
        let err = item.into_entity().unwrap_err();
        assert_eq!(
            err,
            ItemError::Coordinates(CoordinateError {
                field: "lat",
                value: "abc".into()
            })
        );
    }

    #[test]
    fn missing_name_rejected() {
        let item: RawItem =
            serde_json::from_value(json!({ "lat": 37.5, "lon": 127.0 })).unwrap();
        assert_eq!(item.into_entity().unwrap_err(), ItemError::MissingName);
    }

    #[test]
    fn forecast_is_parsed_and_bad_points_skipped() {
        let item: RawItem = serde_json::from_value(json!({
            "name": "A", "lat": 37.5, "lon": 127.0,
            "updated_at": "2024-05-01 13:45",
            "fcst": [
                { "fcst_time": "2024-05-01 14:00", "fcst_congest_lvl": "보통",
                  "fcst_ppltn_min": 100, "fcst_ppltn_max": 200 },
                "garbage"
            ]
        }))
        .unwrap();
        let entity = item.into_entity().unwrap();
        assert_eq!(entity.forecast.len(), 1);
        assert_eq!(entity.forecast[0].level.kind(), LevelKind::Normal);
        assert_eq!(entity.forecast[0].population.max, 200);
        assert!(entity.updated_at.is_some());
    }

    #[test]
    fn legacy_bare_array_and_wrapped_spots() {
        let bare = json!([{ "title": "Gyeongbokgung", "mapx": "126.977", "mapy": "37.579", "contentid": "126508" }]);
        let wrapped = json!({ "spots": [{ "title": "Namsan", "mapx": "126.988", "mapy": "37.551" }] });

        let bare_items = parse_payload(&bare, ApiContract::Legacy).unwrap();
        let entity = bare_items.into_iter().next().unwrap().unwrap().into_entity().unwrap();
        assert_eq!(entity.id.as_str(), "126508");
        assert_eq!(entity.position, LatLng::new(37.579, 126.977));
        assert_eq!(entity.level.kind(), LevelKind::Unknown);

        let wrapped_items = parse_payload(&wrapped, ApiContract::Legacy).unwrap();
        assert_eq!(wrapped_items.len(), 1);

        assert!(parse_payload(&json!({ "ok": true }), ApiContract::Legacy).is_err());
    }

    #[test]
    fn non_record_items_are_item_errors() {
        let body = json!({ "ok": true, "items": [42] });
        let items = parse_payload(&body, ApiContract::Congestion).unwrap();
        assert!(matches!(items[0], Err(ItemError::NotARecord(_))));
    }

    #[test]
    fn contract_parsing() {
        assert_eq!(ApiContract::parse("legacy"), Some(ApiContract::Legacy));
        assert_eq!(ApiContract::parse(" Congestion "), Some(ApiContract::Congestion));
        assert_eq!(ApiContract::parse("graphql"), None);
    }
}
