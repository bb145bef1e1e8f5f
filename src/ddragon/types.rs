//! Data Dragon payload shapes. Only the fields the catalog keeps are modelled.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// `champion.json`: every champion keyed by id.
#[derive(Debug, Clone, Deserialize)]
pub struct ChampionIndex {
    pub data: BTreeMap<String, ChampionSummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChampionSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
}

/// `champion/<id>.json`: a one-entry map from id to the full record.
#[derive(Debug, Clone, Deserialize)]
pub struct ChampionDetailEnvelope {
    pub data: BTreeMap<String, ChampionDetail>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChampionDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lore: String,
    #[serde(default)]
    pub skins: Vec<SkinSummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SkinSummary {
    /// Globally unique; Data Dragon serializes it as a string ("266001").
    #[serde(deserialize_with = "numeric_id")]
    pub id: u32,
    /// Ordinal within the champion, also the splash file suffix.
    pub num: u32,
    pub name: String,
}

fn numeric_id<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
