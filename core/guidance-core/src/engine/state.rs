//! Derives the displayed `GuidanceState` from permission, fix, target and
//! search status, in a fixed priority order.

use crate::config::AccuracyConfig;
use crate::types::{AuthorizationStatus, GuidanceState, HeadingFix, LocationFix};

/// Everything the displayed state depends on.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StateInputs {
    pub(crate) authorization: AuthorizationStatus,
    pub(crate) has_location: bool,
    pub(crate) has_target: bool,
    pub(crate) is_searching: bool,
    pub(crate) last_search_failed: bool,
    pub(crate) has_no_results: bool,
    pub(crate) low_accuracy: bool,
}

pub(crate) fn derive_state(inputs: &StateInputs) -> GuidanceState {
    match inputs.authorization {
        AuthorizationStatus::NotDetermined => GuidanceState::PermissionNotDetermined,
        AuthorizationStatus::Restricted | AuthorizationStatus::Denied => {
            GuidanceState::PermissionDenied
        }
        AuthorizationStatus::AuthorizedWhenInUse | AuthorizationStatus::AuthorizedAlways => {
            if !inputs.has_location {
                GuidanceState::Locating
            } else if inputs.has_target {
                if inputs.low_accuracy {
                    GuidanceState::LowAccuracy
                } else {
                    GuidanceState::Navigating
                }
            } else if inputs.is_searching {
                GuidanceState::Searching
            } else if inputs.last_search_failed {
                GuidanceState::Error
            } else if inputs.has_no_results {
                GuidanceState::NotFound
            } else {
                GuidanceState::Searching
            }
        }
    }
}

/// True when the fix or the compass is too poor to trust the arrow.
pub(crate) fn is_low_accuracy(
    location: Option<&LocationFix>,
    heading: Option<&HeadingFix>,
    best_heading: Option<f64>,
    config: &AccuracyConfig,
) -> bool {
    let Some(location) = location else {
        return true;
    };

    if location.horizontal_accuracy < 0.0
        || location.horizontal_accuracy > config.max_horizontal_accuracy_meters
    {
        return true;
    }

    match heading {
        Some(heading) => {
            heading.heading_accuracy < 0.0
                || heading.heading_accuracy > config.max_heading_accuracy_degrees
        }
        None => best_heading.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinate;

    fn inputs(authorization: AuthorizationStatus) -> StateInputs {
        StateInputs {
            authorization,
            has_location: true,
            has_target: false,
            is_searching: false,
            last_search_failed: false,
            has_no_results: false,
            low_accuracy: false,
        }
    }

    fn authorized() -> StateInputs {
        inputs(AuthorizationStatus::AuthorizedWhenInUse)
    }

    fn fix(accuracy: f64) -> LocationFix {
        LocationFix {
            coordinate: Coordinate::new(35.0, 139.0),
            horizontal_accuracy: accuracy,
            course: None,
        }
    }

    fn heading(accuracy: f64) -> HeadingFix {
        HeadingFix {
            true_heading: 10.0,
            magnetic_heading: 12.0,
            heading_accuracy: accuracy,
        }
    }

    #[test]
    fn permission_states_take_precedence() {
        assert_eq!(
            derive_state(&inputs(AuthorizationStatus::NotDetermined)),
            GuidanceState::PermissionNotDetermined
        );
        assert_eq!(
            derive_state(&inputs(AuthorizationStatus::Denied)),
            GuidanceState::PermissionDenied
        );
        assert_eq!(
            derive_state(&inputs(AuthorizationStatus::Restricted)),
            GuidanceState::PermissionDenied
        );
    }

    #[test]
    fn authorized_without_fix_is_locating() {
        let state = derive_state(&StateInputs {
            has_location: false,
            has_target: true,
            ..authorized()
        });
        assert_eq!(state, GuidanceState::Locating);
    }

    #[test]
    fn target_means_navigating_unless_low_accuracy() {
        let with_target = StateInputs {
            has_target: true,
            is_searching: true,
            last_search_failed: true,
            ..authorized()
        };
        assert_eq!(derive_state(&with_target), GuidanceState::Navigating);
        assert_eq!(
            derive_state(&StateInputs {
                low_accuracy: true,
                ..with_target
            }),
            GuidanceState::LowAccuracy
        );
    }

    #[test]
    fn no_target_outcomes() {
        assert_eq!(
            derive_state(&StateInputs {
                is_searching: true,
                last_search_failed: true,
                ..authorized()
            }),
            GuidanceState::Searching
        );
        assert_eq!(
            derive_state(&StateInputs {
                last_search_failed: true,
                ..authorized()
            }),
            GuidanceState::Error
        );
        assert_eq!(
            derive_state(&StateInputs {
                has_no_results: true,
                ..authorized()
            }),
            GuidanceState::NotFound
        );
        assert_eq!(derive_state(&authorized()), GuidanceState::Searching);
    }

    #[test]
    fn accuracy_gate_thresholds() {
        let config = AccuracyConfig::default();
        let good_heading = heading(5.0);

        assert!(!is_low_accuracy(Some(&fix(65.0)), Some(&good_heading), Some(10.0), &config));
        assert!(is_low_accuracy(Some(&fix(65.1)), Some(&good_heading), Some(10.0), &config));
        assert!(is_low_accuracy(Some(&fix(-1.0)), Some(&good_heading), Some(10.0), &config));
        assert!(is_low_accuracy(Some(&fix(10.0)), Some(&heading(25.1)), Some(10.0), &config));
        assert!(is_low_accuracy(Some(&fix(10.0)), Some(&heading(-1.0)), None, &config));
        assert!(!is_low_accuracy(Some(&fix(10.0)), Some(&heading(25.0)), Some(10.0), &config));
        assert!(is_low_accuracy(None, None, None, &config));
    }

    #[test]
    fn course_can_stand_in_for_missing_compass() {
        let config = AccuracyConfig::default();
        assert!(!is_low_accuracy(Some(&fix(10.0)), None, Some(180.0), &config));
        assert!(is_low_accuracy(Some(&fix(10.0)), None, None, &config));
    }
}
