//! The read-only view handed to presentation code.

use serde::Serialize;

use crate::distance::{self, DistancePresentation, DistanceZone};
use crate::types::{GuidanceState, SearchMode, Spot, SpotCategory};

/// Everything a client needs to draw one frame.
///
/// Built from the engine's canonical fields on every tick; never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, uniffi::Record)]
pub struct GuidanceSnapshot {
    pub state: GuidanceState,
    pub status_message: Option<String>,
    /// Degrees to rotate the arrow, relative to where the device points.
    pub arrow_angle_degrees: Option<f64>,
    pub distance_text: String,
    pub distance_detail_text: Option<String>,
    pub distance_zone: Option<DistanceZone>,
    pub distance_meters: Option<f64>,
    pub current_target: Option<Spot>,
    pub current_spot_display_name: Option<String>,
    pub search_mode: SearchMode,
    pub should_suggest_cafe_fallback: bool,
    pub is_showing_cafe_alternative: bool,
    pub cafe_fallback_message: Option<String>,
    pub should_show_permission_button: bool,
    pub should_show_settings_button: bool,
    pub should_show_retry_button: bool,
}

impl GuidanceSnapshot {
    pub(crate) fn build(
        state: GuidanceState,
        arrow_angle_degrees: Option<f64>,
        distance_meters: Option<f64>,
        presentation: Option<&DistancePresentation>,
        target: Option<&Spot>,
        search_mode: SearchMode,
    ) -> Self {
        let zone = presentation.map(|p| p.zone);

        Self {
            state,
            status_message: status_message(state).map(str::to_string),
            arrow_angle_degrees,
            distance_text: presentation
                .map(|p| p.text.clone())
                .unwrap_or_else(|| "--".to_string()),
            distance_detail_text: distance_meters.map(distance::detail_text),
            distance_zone: zone,
            distance_meters,
            current_target: target.cloned(),
            current_spot_display_name: target.map(display_name),
            search_mode,
            should_suggest_cafe_fallback: search_mode == SearchMode::SmokingOnly
                && zone.is_some_and(DistanceZone::suggests_cafe_fallback),
            is_showing_cafe_alternative: target.is_some_and(|t| t.category == SpotCategory::Cafe),
            cafe_fallback_message: (search_mode == SearchMode::IncludeCafe
                && zone.is_some_and(DistanceZone::shows_cafe_notice))
            .then(|| "カフェも候補に追加しています".to_string()),
            should_show_permission_button: state == GuidanceState::PermissionNotDetermined,
            should_show_settings_button: state == GuidanceState::PermissionDenied,
            should_show_retry_button: matches!(
                state,
                GuidanceState::Error | GuidanceState::NotFound
            ),
        }
    }
}

impl Default for GuidanceSnapshot {
    fn default() -> Self {
        Self::build(
            GuidanceState::PermissionNotDetermined,
            None,
            None,
            None,
            None,
            SearchMode::SmokingOnly,
        )
    }
}

pub fn status_message(state: GuidanceState) -> Option<&'static str> {
    match state {
        GuidanceState::PermissionNotDetermined => Some("位置情報を許可してください"),
        GuidanceState::PermissionDenied => {
            Some("位置情報が許可されていません（設定で変更できます）")
        }
        GuidanceState::Locating => Some("測位中…"),
        GuidanceState::Searching => Some("検索中…"),
        GuidanceState::LowAccuracy => Some("測位精度が低い可能性があります"),
        GuidanceState::NotFound => Some("付近に喫煙所が見つかりません（最大5km）"),
        GuidanceState::Error => Some("検索に失敗しました"),
        GuidanceState::Navigating => None,
    }
}

pub fn display_name(spot: &Spot) -> String {
    let trimmed = spot
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    match (spot.category, trimmed) {
        (SpotCategory::Cafe, Some(name)) => format!("喫煙可能なカフェ：{}", name),
        (SpotCategory::Cafe, None) => "喫煙可能なカフェ".to_string(),
        (SpotCategory::SmokingSpot, Some(name)) => name.to_string(),
        (SpotCategory::SmokingSpot, None) => "喫煙所".to_string(),
    }
}
