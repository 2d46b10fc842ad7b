//! Maps a distance in meters to a walking zone and display strings.

use serde::{Deserialize, Serialize};

const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum DistanceZone {
    Unknown,
    Near,
    Walkable,
    Hesitant,
    Far,
    OutOfRange,
    OutOfRangeLong,
}

impl DistanceZone {
    /// Zones where the nearest smoking spot is far enough to offer cafés instead.
    pub fn suggests_cafe_fallback(self) -> bool {
        matches!(
            self,
            Self::Hesitant | Self::Far | Self::OutOfRange | Self::OutOfRangeLong
        )
    }

    /// Zones where the café notice stays visible once cafés are included.
    pub fn shows_cafe_notice(self) -> bool {
        matches!(self, Self::OutOfRange | Self::OutOfRangeLong)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => PLACEHOLDER,
            Self::Near => "すぐ近く",
            Self::Walkable => "徒歩圏内",
            Self::Hesitant => "少し遠い",
            Self::Far => "かなり遠い",
            Self::OutOfRange | Self::OutOfRangeLong => "徒歩圏外",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct DistancePresentation {
    pub zone: DistanceZone,
    pub text: String,
}

pub fn zone(meters: f64) -> DistanceZone {
    if !meters.is_finite() || meters < 0.0 {
        return DistanceZone::Unknown;
    }

    match meters {
        m if m < 150.0 => DistanceZone::Near,
        m if m < 400.0 => DistanceZone::Walkable,
        m if m < 600.0 => DistanceZone::Hesitant,
        m if m < 800.0 => DistanceZone::Far,
        m if m < 1000.0 => DistanceZone::OutOfRange,
        _ => DistanceZone::OutOfRangeLong,
    }
}

pub fn presentation(meters: f64) -> DistancePresentation {
    let zone = zone(meters);
    DistancePresentation {
        zone,
        text: zone.label().to_string(),
    }
}

/// Numeric distance: whole meters below 1 km, one decimal below 10 km, whole km above.
pub fn detail_text(meters: f64) -> String {
    if !meters.is_finite() || meters < 0.0 {
        return PLACEHOLDER.to_string();
    }
    if meters < 1000.0 {
        return format!("{}m", meters.round() as i64);
    }

    let km = meters / 1000.0;
    if km < 10.0 {
        format!("{:.1}km", km)
    } else {
        format!("{:.0}km", km)
    }
}
