//! WMO weather code descriptions.
//!
//! Open-Meteo reports conditions as WMO codes; answers carry a readable
//! description in the requested language, falling back to English.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language for weather descriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            other => Err(format!("unsupported language '{}'", other)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::En => f.write_str("en"),
            Language::Zh => f.write_str("zh"),
        }
    }
}

/// Readable text for a WMO weather code.
pub fn describe(code: u8, lang: Language) -> String {
    let text = match lang {
        Language::Zh => chinese(code).or_else(|| english(code)),
        Language::En => english(code),
    };
    text.map(str::to_string)
        .unwrap_or_else(|| format!("Unknown code {}", code))
}

fn english(code: u8) -> Option<&'static str> {
    let text = match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => return None,
    };
    Some(text)
}

fn chinese(code: u8) -> Option<&'static str> {
    let text = match code {
        0 => "晴空",
        1 => "多云转晴",
        2 => "多云",
        3 => "阴",
        45 => "雾",
        48 => "霜雾",
        51 => "小毛毛雨",
        53 => "中毛毛雨",
        55 => "大毛毛雨",
        56 | 66 => "小冻雨",
        57 | 67 => "大冻雨",
        61 => "小雨",
        63 => "中雨",
        65 => "大雨",
        71 => "小雪",
        73 => "中雪",
        75 => "大雪",
        77 => "米雪",
        80 => "小阵雨",
        81 => "中阵雨",
        82 => "大阵雨",
        85 => "小阵雪",
        86 => "大阵雪",
        95 => "雷暴",
        96 => "雷暴伴小冰雹",
        99 => "雷暴伴大冰雹",
        _ => return None,
    };
    Some(text)
}
