//! Discord 在 JSON 中以字符串传递 64 位 ID

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text.parse().map_err(de::Error::custom),
        RawId::Number(n) => Ok(n),
    }
}
