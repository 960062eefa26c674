//! Protobuf messages exchanged with the analytics and ML services.
//!
//! Field numbers mirror the services' `.proto` definitions. Messages also derive
//! `Serialize` so handlers can relay them to clients unchanged, using the same
//! camelCase field names the services' other consumers see.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Serialize, Serializer};

/// Time window for heatmaps and readings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ReadingTimespan {
    Hour = 0,
    Day = 1,
    Week = 2,
    Month = 3,
}

impl ReadingTimespan {
    /// Protobuf enum value name
    pub fn as_str_name(&self) -> &'static str {
        match self {
            ReadingTimespan::Hour => "HOUR",
            ReadingTimespan::Day => "DAY",
            ReadingTimespan::Week => "WEEK",
            ReadingTimespan::Month => "MONTH",
        }
    }

    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "HOUR" => Some(Self::Hour),
            "DAY" => Some(Self::Day),
            "WEEK" => Some(Self::Week),
            "MONTH" => Some(Self::Month),
            _ => None,
        }
    }
}

/// Case-insensitive: `month`, `MONTH` and `Month` are all accepted
impl FromStr for ReadingTimespan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_name(&s.to_ascii_uppercase()).ok_or_else(|| format!("invalid timespan: {}", s))
    }
}

fn serialize_timespan<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
    match ReadingTimespan::try_from(*value) {
        Ok(timespan) => serializer.serialize_str(timespan.as_str_name()),
        Err(_) => serializer.serialize_i32(*value),
    }
}

/// RFC 3339, or `null` when absent or out of range
fn serialize_timestamp<S: Serializer>(value: &Option<Timestamp>, serializer: S) -> Result<S::Ok, S::Error> {
    match value.as_ref().and_then(Timestamp::to_datetime) {
        Some(datetime) => serializer.serialize_str(&datetime.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => serializer.serialize_none(),
    }
}

/// Wire-compatible with `google.protobuf.Timestamp`
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl Timestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let nanos = u32::try_from(self.nanos).ok()?;
        Utc.timestamp_opt(self.seconds, nanos).single()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanos: value.timestamp_subsec_nanos() as i32,
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferSymptomsAndCauseRequest {
    #[prost(string, tag = "1")]
    pub text: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferSymptomsAndCauseResponse {
    /// Symptom name -> severity
    #[prost(map = "string, int32", tag = "1")]
    pub symptoms: HashMap<String, i32>,
    #[prost(string, tag = "2")]
    pub cause: String,
    #[prost(bool, tag = "3")]
    pub success: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message, Serialize)]
pub struct Location {
    #[prost(double, tag = "1")]
    pub lat: f64,
    #[prost(double, tag = "2")]
    pub lon: f64,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapPoint {
    #[prost(message, optional, tag = "1")]
    pub location: Option<Location>,
    #[prost(double, tag = "2")]
    pub intensity: f64,
    /// Spread in meters
    #[prost(double, tag = "3")]
    pub radius: f64,
}

/// Points approximating one cluster's shape
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapPointGroup {
    #[prost(message, repeated, tag = "1")]
    pub points: Vec<HeatmapPoint>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchHeatmapRequest {
    #[prost(enumeration = "ReadingTimespan", tag = "1")]
    #[serde(serialize_with = "serialize_timespan")]
    pub timespan: i32,
    /// Causes or symptoms to filter by; empty means no filter
    #[prost(string, repeated, tag = "2")]
    pub similarity: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchHeatmapResponse {
    #[prost(message, repeated, tag = "1")]
    pub heatmap_points: Vec<HeatmapPointGroup>,
    #[prost(string, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateReadingRequest {
    #[prost(enumeration = "ReadingTimespan", tag = "1")]
    #[serde(serialize_with = "serialize_timespan")]
    pub timespan: i32,
    #[prost(string, repeated, tag = "2")]
    pub similarity: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[prost(message, optional, tag = "1")]
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: Option<Timestamp>,
    #[prost(enumeration = "ReadingTimespan", tag = "2")]
    #[serde(serialize_with = "serialize_timespan")]
    pub timespan: i32,
    #[prost(string, repeated, tag = "3")]
    pub similarity: Vec<String>,
    #[prost(message, repeated, tag = "4")]
    pub heatmap_points: Vec<HeatmapPoint>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateReadingResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, optional, tag = "2")]
    pub error: Option<String>,
    #[prost(message, optional, tag = "3")]
    pub reading: Option<Reading>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct FetchLatestDataRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchLatestDataResponse {
    #[prost(message, optional, tag = "1")]
    pub time_window_start: Option<Timestamp>,
    #[prost(message, optional, tag = "2")]
    pub time_window_end: Option<Timestamp>,
    /// GeoJSON `FeatureCollection` serialized as a string
    #[prost(string, optional, tag = "3")]
    pub geojson: Option<String>,
}
