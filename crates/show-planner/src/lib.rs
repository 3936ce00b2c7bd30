//! # Show Planner
//!
//! Flight plans for individual drones: path length and flight time over an
//! ordered waypoint list, and validation against altitude, speed and
//! spacing limits.
//!
//! Validation never fails. It returns a [`ValidationReport`] listing every
//! violated limit so an operator can fix a plan in one pass.

use serde::{Deserialize, Serialize};
use show_core::{
    CoreError, CoreResult, DroneId, FlightPlan, SafetyMargins, Waypoint, WaypointId,
    haversine_distance, segment_distance_3d,
};
use std::fmt;
use tracing::{debug, info, warn};

/// Cruise speed used when a waypoint carries none (m/s)
pub const DEFAULT_SPEED: f64 = 5.0;

/// Limits a flight plan is validated against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanLimits {
    /// Meters
    pub max_altitude: f64,
    /// Meters
    pub min_altitude: f64,
    /// Meters per second
    pub max_speed: f64,
    /// Minimum horizontal spacing between consecutive waypoints (m)
    pub min_spacing: f64,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_altitude: 400.0,
            min_altitude: 0.0,
            max_speed: 20.0,
            min_spacing: 1.0,
        }
    }
}

/// One violated limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Finding {
    AltitudeTooHigh {
        waypoint: WaypointId,
        altitude: f64,
        limit: f64,
    },
    AltitudeNegative {
        waypoint: WaypointId,
        altitude: f64,
    },
    SpeedTooHigh {
        waypoint: WaypointId,
        speed: f64,
        limit: f64,
    },
    TooClose {
        from: WaypointId,
        to: WaypointId,
        distance: f64,
    },
}

impl Finding {
    /// Short label for the violated limit
    pub fn kind(&self) -> &'static str {
        match self {
            Finding::AltitudeTooHigh { .. } => "altitude_too_high",
            Finding::AltitudeNegative { .. } => "altitude_negative",
            Finding::SpeedTooHigh { .. } => "speed_too_high",
            Finding::TooClose { .. } => "too_close",
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::AltitudeTooHigh { waypoint, limit, .. } => {
                write!(f, "Waypoint {}: Altitude exceeds {}m limit", waypoint, limit)
            }
            Finding::AltitudeNegative { waypoint, .. } => {
                write!(f, "Waypoint {}: Altitude cannot be negative", waypoint)
            }
            Finding::SpeedTooHigh { waypoint, limit, .. } => {
                write!(f, "Waypoint {}: Speed exceeds {} m/s limit", waypoint, limit)
            }
            Finding::TooClose { from, to, .. } => {
                write!(f, "Waypoints {} and {}: Too close together", from, to)
            }
        }
    }
}

/// Outcome of validating a flight plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    fn from_findings(findings: Vec<Finding>) -> Self {
        Self {
            valid: findings.is_empty(),
            findings,
        }
    }

    /// Human-readable messages, one per finding
    pub fn errors(&self) -> Vec<String> {
        self.findings.iter().map(ToString::to_string).collect()
    }
}

/// Builds and checks flight plans
#[derive(Debug, Clone)]
pub struct FlightPlanner {
    default_speed: f64,
    limits: PlanLimits,
}

impl Default for FlightPlanner {
    fn default() -> Self {
        Self {
            default_speed: DEFAULT_SPEED,
            limits: PlanLimits::default(),
        }
    }
}

impl FlightPlanner {
    pub fn new(default_speed: f64) -> CoreResult<Self> {
        if !(default_speed.is_finite() && default_speed > 0.0) {
            return Err(CoreError::invalid_parameter(
                "default_speed",
                "must be a positive speed",
            ));
        }
        Ok(Self {
            default_speed,
            ..Default::default()
        })
    }

    pub fn with_limits(mut self, limits: PlanLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn default_speed(&self) -> f64 {
        self.default_speed
    }

    pub fn limits(&self) -> &PlanLimits {
        &self.limits
    }

    /// Sum path length and flight time over consecutive waypoints.
    ///
    /// Each segment is flown at the departing waypoint's speed (the planner
    /// default when that speed is unset). Action time on the arriving
    /// waypoint is added to the flight time.
    pub fn generate_flight_plan(
        &self,
        drone_id: impl Into<DroneId>,
        waypoints: Vec<Waypoint>,
    ) -> FlightPlan {
        let drone_id = drone_id.into();
        let mut total_distance = 0.0;
        let mut estimated_flight_time = 0.0;

        for pair in waypoints.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            let segment = segment_distance_3d(&prev.position, &curr.position);

            total_distance += segment;
            estimated_flight_time += segment / self.segment_speed(prev);

            if let Some(action) = &curr.action {
                estimated_flight_time += action.duration;
            }
        }

        info!(
            "Flight plan for {}: {} waypoints, {:.1}m, {:.1}s",
            drone_id,
            waypoints.len(),
            total_distance,
            estimated_flight_time
        );

        FlightPlan {
            drone_id,
            waypoints,
            total_distance,
            estimated_flight_time,
            safety_margins: SafetyMargins::default(),
        }
    }

    /// Collect every limit the plan violates.
    ///
    /// Findings are ordered altitude checks first, then speeds, then spacing.
    pub fn validate_flight_plan(&self, plan: &FlightPlan) -> ValidationReport {
        let limits = &self.limits;
        let mut findings = Vec::new();

        for waypoint in &plan.waypoints {
            let altitude = waypoint.position.altitude;
            if altitude > limits.max_altitude {
                findings.push(Finding::AltitudeTooHigh {
                    waypoint: waypoint.id.clone(),
                    altitude,
                    limit: limits.max_altitude,
                });
            }
            if altitude < limits.min_altitude {
                findings.push(Finding::AltitudeNegative {
                    waypoint: waypoint.id.clone(),
                    altitude,
                });
            }
        }

        for waypoint in &plan.waypoints {
            if waypoint.speed > limits.max_speed {
                findings.push(Finding::SpeedTooHigh {
                    waypoint: waypoint.id.clone(),
                    speed: waypoint.speed,
                    limit: limits.max_speed,
                });
            }
        }

        for pair in plan.waypoints.windows(2) {
            let distance = haversine_distance(&pair[0].position, &pair[1].position);
            if distance < limits.min_spacing {
                findings.push(Finding::TooClose {
                    from: pair[0].id.clone(),
                    to: pair[1].id.clone(),
                    distance,
                });
            }
        }

        for finding in &findings {
            debug!("Flight plan finding: {}", finding);
        }

        let report = ValidationReport::from_findings(findings);
        if report.valid {
            info!("Flight plan for {} is valid", plan.drone_id);
        } else {
            warn!(
                "Flight plan for {} failed validation with {} findings",
                plan.drone_id,
                report.findings.len()
            );
        }
        report
    }

    fn segment_speed(&self, waypoint: &Waypoint) -> f64 {
        if waypoint.speed.is_finite() && waypoint.speed > 0.0 {
            waypoint.speed
        } else {
            self.default_speed
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use show_core::{ActionType, GeoPoint, METERS_PER_DEGREE, WaypointAction};

    fn waypoint(id: &str, lat: f64, lng: f64, alt: f64, speed: f64) -> Waypoint {
        Waypoint::new(id, GeoPoint::new(lat, lng, alt), speed)
    }

    #[test]
    fn test_plan_totals() {
        let planner = FlightPlanner::default();
        let waypoints = vec![
            waypoint("wp-1", 35.0, 139.0, 50.0, 10.0),
            waypoint("wp-2", 35.001, 139.0, 50.0, 10.0),
            waypoint("wp-3", 35.001, 139.0, 80.0, 0.0)
                .with_action(WaypointAction::new(ActionType::Hover, 4.0)),
        ];

        let plan = planner.generate_flight_plan("drone-1", waypoints);

        let leg = haversine_distance(&GeoPoint::new(35.0, 139.0, 0.0), &GeoPoint::new(35.001, 139.0, 0.0));
        assert!((plan.total_distance - (leg + 30.0)).abs() < 1e-6);
        // 10 m/s for both legs, then the hover
        let expected_time = leg / 10.0 + 30.0 / 10.0 + 4.0;
        assert!((plan.estimated_flight_time - expected_time).abs() < 1e-6);
        assert_eq!(plan.safety_margins, SafetyMargins::default());
        assert_eq!(plan.drone_id.as_str(), "drone-1");
    }

    #[test]
    fn test_unset_speed_uses_default() {
        let planner = FlightPlanner::new(2.0).unwrap();
        let plan = planner.generate_flight_plan(
            "drone-2",
            vec![
                waypoint("a", 35.0, 139.0, 50.0, 0.0),
                waypoint("b", 35.0, 139.0, 70.0, 0.0),
            ],
        );

        assert!((plan.total_distance - 20.0).abs() < 1e-9);
        assert!((plan.estimated_flight_time - 10.0).abs() < 1e-9);
        assert!(FlightPlanner::new(0.0).is_err());
    }

    #[test]
    fn test_short_plans() {
        let planner = FlightPlanner::default();

        let empty = planner.generate_flight_plan("drone-3", Vec::new());
        assert_eq!(empty.total_distance, 0.0);
        assert!(planner.validate_flight_plan(&empty).valid);

        let single = planner.generate_flight_plan("drone-3", vec![waypoint("only", 35.0, 139.0, 50.0, 5.0)]);
        assert_eq!(single.estimated_flight_time, 0.0);
        assert!(planner.validate_flight_plan(&single).valid);
    }

    #[test]
    fn test_validation_reports_every_violation() {
        let planner = FlightPlanner::default();
        let wp2_lat = 35.001;
        let plan = planner.generate_flight_plan(
            "drone-4",
            vec![
                waypoint("wp-1", 35.0, 139.0, 50.0, 5.0),
                waypoint("wp-2", wp2_lat, 139.0, 500.0, 5.0),
                waypoint("wp-3", wp2_lat + 0.5 / METERS_PER_DEGREE, 139.0, 100.0, 25.0),
            ],
        );

        let report = planner.validate_flight_plan(&plan);

        assert!(!report.valid);
        assert_eq!(report.findings.len(), 3);
        assert_eq!(
            report.errors(),
            vec![
                "Waypoint wp-2: Altitude exceeds 400m limit",
                "Waypoint wp-3: Speed exceeds 20 m/s limit",
                "Waypoints wp-2 and wp-3: Too close together",
            ]
        );
    }

    #[test]
    fn test_negative_altitude_and_boundaries() {
        let planner = FlightPlanner::default();
        let plan = planner.generate_flight_plan(
            "drone-5",
            vec![
                waypoint("low", 35.0, 139.0, -1.0, 20.0),
                waypoint("edge", 35.01, 139.0, 400.0, 20.0),
            ],
        );

        let report = planner.validate_flight_plan(&plan);

        assert_eq!(report.errors(), vec!["Waypoint low: Altitude cannot be negative"]);
        assert!(matches!(report.findings[0], Finding::AltitudeNegative { altitude, .. } if altitude == -1.0));
    }

    #[test]
    fn test_custom_limits() {
        let planner = FlightPlanner::default().with_limits(PlanLimits {
            max_altitude: 120.0,
            ..Default::default()
        });
        let plan = planner.generate_flight_plan(
            "drone-6",
            vec![waypoint("a", 35.0, 139.0, 150.0, 5.0)],
        );

        let report = planner.validate_flight_plan(&plan);
        assert_eq!(report.errors(), vec!["Waypoint a: Altitude exceeds 120m limit"]);
    }

    #[test]
    fn test_report_serializes_findings() {
        let report = ValidationReport::from_findings(vec![Finding::TooClose {
            from: WaypointId::new("a"),
            to: WaypointId::new("b"),
            distance: 0.2,
        }]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["findings"][0]["kind"], "tooClose");
    }
}
