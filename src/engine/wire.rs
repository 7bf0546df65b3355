//! Binary payload stored per device: protobuf `UserApps`, byte-compatible with the
//! `appsinstalled.proto` consumers already read.

use anyhow::{Context, Result};
use prost::Message;

use crate::engine::parser::parse_line;
use crate::{AppsFallback, InstallRecord};

/// Wire message. Tags and the unpacked `apps` field match the proto2 definition.
#[derive(Clone, PartialEq, Message)]
pub struct UserApps {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub apps: Vec<u32>,
    #[prost(double, optional, tag = "2")]
    pub lat: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub lon: Option<f64>,
}

impl From<&InstallRecord> for UserApps {
    fn from(rec: &InstallRecord) -> Self {
        UserApps {
            apps: rec.apps.clone(),
            lat: Some(rec.lat),
            lon: Some(rec.lon),
        }
    }
}

/// Serialize the stored part of `rec` (coordinates and apps).
pub fn encode(rec: &InstallRecord) -> Vec<u8> {
    UserApps::from(rec).encode_to_vec()
}

/// Rebuild a record from its storage key and payload.
pub fn decode(key: &str, payload: &[u8]) -> Result<InstallRecord> {
    let (device_type, device_id) = key
        .split_once(':')
        .with_context(|| format!("key `{key}` is not device_type:device_id"))?;
    let msg = UserApps::decode(payload).context("decode UserApps payload")?;
    Ok(InstallRecord {
        device_type: device_type.to_string(),
        device_id: device_id.to_string(),
        lat: msg.lat.unwrap_or_default(),
        lon: msg.lon.unwrap_or_default(),
        apps: msg.apps,
    })
}

/// One-line rendering for dry-run logs.
pub fn describe(payload: &[u8]) -> String {
    match UserApps::decode(payload) {
        Ok(msg) => format!(
            "lat: {} lon: {} apps: {:?}",
            msg.lat.unwrap_or_default(),
            msg.lon.unwrap_or_default(),
            msg.apps
        ),
        Err(e) => format!("<undecodable payload: {e}>"),
    }
}

const SAMPLE: &str = "idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23\n\
                      gaid\t7rfw452y52g2gq4g\t55.55\t42.42\t7423,424";

/// Parse, encode and decode two sample lines; fails if any record does not survive the trip.
pub fn self_check() -> Result<()> {
    for line in SAMPLE.lines() {
        let rec = parse_line(line.as_bytes(), AppsFallback::KeepNumeric)?;
        let back = decode(&rec.key(), &encode(&rec))?;
        anyhow::ensure!(back == rec, "round trip mismatch for {}", rec.key());
    }
    Ok(())
}
