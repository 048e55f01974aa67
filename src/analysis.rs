//! Post-flight analysis of a logged session
//!
//! Reads the tab-separated session log back and derives a flight
//! summary: apogee, maximum climb velocity, liftoff and landing
//! detection, and the drogue/main descent intervals. Absent cells
//! (the `~` sentinel) are skipped, never treated as zero.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::conversion::VELOCITY_DT_EPSILON;
use crate::types::frame::{F_ALT, F_PARACHUTES, F_TIME};

// Detection thresholds, matching the live ground-station heuristics:
// liftoff once the vehicle climbs this far above the lowest sample,
// landed once it is back near the ground and nearly still.
const LIFTOFF_CLIMB_M: f64 = 15.0;
const LANDING_ALTITUDE_M: f64 = 5.0;
const LANDING_SPEED_MS: f64 = 1.0;

/// Summary of one logged flight
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlightSummary {
    pub apogee_m: f64,
    pub apogee_time_s: f64,
    pub max_climb_velocity_ms: f64,
    pub liftoff_time_s: Option<f64>,
    pub landing_time_s: Option<f64>,
    pub flight_time_s: Option<f64>,
    /// First reported drogue deployment (either drogue channel)
    pub drogue_deploy_time_s: Option<f64>,
    /// First reported main deployment (either main channel)
    pub main_deploy_time_s: Option<f64>,
    /// Drogue phase duration, deploy to main deploy
    pub drogue_descent_s: Option<f64>,
    /// Main phase duration, deploy to landing
    pub main_descent_s: Option<f64>,
}

/// Analyze a session log file written by the session logger.
pub fn analyze_session_log(path: &Path) -> Result<FlightSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open session log: {:?}", path))?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let t_col = column(F_TIME).ok_or_else(|| anyhow!("log has no {} column", F_TIME))?;
    let alt_col = column(F_ALT).ok_or_else(|| anyhow!("log has no {} column", F_ALT))?;
    let parachute_cols: Vec<Option<usize>> = F_PARACHUTES.iter().map(|&n| column(n)).collect();

    let mut series = Vec::new();
    // First time each recovery channel reports a non-zero height
    let mut deploy_times: [Option<f64>; 4] = [None; 4];

    for record in reader.records() {
        let record = record?;
        let cell = |idx: usize| record.get(idx).and_then(|c| c.parse::<f64>().ok());

        let (t, alt) = match (cell(t_col), cell(alt_col)) {
            (Some(t), Some(alt)) => (t, alt),
            _ => continue,
        };
        series.push((t, alt));

        for (channel, col) in parachute_cols.iter().enumerate() {
            if deploy_times[channel].is_none() {
                if let Some(height) = col.and_then(cell) {
                    if height != 0.0 {
                        deploy_times[channel] = Some(t);
                    }
                }
            }
        }
    }

    let drogue = earliest(deploy_times[0], deploy_times[1]);
    let main = earliest(deploy_times[2], deploy_times[3]);
    analyze_series(&series, drogue, main)
}

/// Compute the summary from an in-memory altitude series and the first
/// drogue/main deployment times.
pub fn analyze_series(
    series: &[(f64, f64)],
    drogue_deploy_time_s: Option<f64>,
    main_deploy_time_s: Option<f64>,
) -> Result<FlightSummary> {
    if series.is_empty() {
        return Err(anyhow!("no altitude samples in log"));
    }

    let (apogee_time_s, apogee_m) = series
        .iter()
        .copied()
        .fold(series[0], |best, s| if s.1 > best.1 { s } else { best });
    let ground_m = series.iter().map(|s| s.1).fold(f64::INFINITY, f64::min);

    let mut max_climb_velocity_ms: f64 = 0.0;
    let mut liftoff_time_s = None;
    let mut landing_time_s = None;

    for window in series.windows(2) {
        let (t0, alt0) = window[0];
        let (t1, alt1) = window[1];
        let dt = t1 - t0;
        let velocity = if dt.abs() > VELOCITY_DT_EPSILON {
            (alt1 - alt0) / dt
        } else {
            0.0
        };
        max_climb_velocity_ms = max_climb_velocity_ms.max(velocity);

        if liftoff_time_s.is_none() && alt1 > ground_m + LIFTOFF_CLIMB_M {
            liftoff_time_s = Some(t1);
        }
        if liftoff_time_s.is_some()
            && landing_time_s.is_none()
            && t1 > apogee_time_s
            && alt1 < ground_m + LANDING_ALTITUDE_M
            && velocity.abs() < LANDING_SPEED_MS
        {
            landing_time_s = Some(t1);
        }
    }

    let flight_time_s = match (liftoff_time_s, landing_time_s) {
        (Some(up), Some(down)) => Some(down - up),
        _ => None,
    };
    let drogue_descent_s = match (drogue_deploy_time_s, main_deploy_time_s) {
        (Some(d), Some(m)) => Some(m - d),
        _ => None,
    };
    let main_descent_s = match (main_deploy_time_s, landing_time_s) {
        (Some(m), Some(down)) => Some(down - m),
        _ => None,
    };

    Ok(FlightSummary {
        apogee_m,
        apogee_time_s,
        max_climb_velocity_ms,
        liftoff_time_s,
        landing_time_s,
        flight_time_s,
        drogue_deploy_time_s,
        main_deploy_time_s,
        drogue_descent_s,
        main_descent_s,
    })
}

fn earliest(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Boost to 20 s apogee at 400 m, drogue descent, main at 120 m,
    /// touchdown around t = 80 s
    fn flight_series() -> Vec<(f64, f64)> {
        let mut series = Vec::new();
        for i in 0..=20 {
            let t = i as f64;
            series.push((t, t * t)); // climb to 400 m
        }
        for i in 1..=56 {
            let t = 20.0 + i as f64;
            series.push((t, 400.0 - 7.0 * i as f64)); // descent at 7 m/s
        }
        series.push((78.0, 3.0));
        series.push((80.0, 2.0));
        series.push((82.0, 2.0));
        series
    }

    #[test]
    fn test_empty_series_is_an_error() {
        assert!(analyze_series(&[], None, None).is_err());
    }

    #[test]
    fn test_apogee_and_flight_phases() {
        let summary = analyze_series(&flight_series(), Some(21.0), Some(60.0)).unwrap();
        assert_eq!(summary.apogee_m, 400.0);
        assert_eq!(summary.apogee_time_s, 20.0);
        assert!(summary.max_climb_velocity_ms > 30.0);
        assert_eq!(summary.liftoff_time_s, Some(4.0)); // 16 m > 15 m threshold
        assert_eq!(summary.landing_time_s, Some(80.0));
        assert_eq!(summary.flight_time_s, Some(76.0));
        assert_eq!(summary.drogue_descent_s, Some(39.0));
        assert_eq!(summary.main_descent_s, Some(20.0));
    }

    #[test]
    fn test_missing_deployments_leave_descents_unknown() {
        let summary = analyze_series(&flight_series(), None, None).unwrap();
        assert_eq!(summary.drogue_descent_s, None);
        assert_eq!(summary.main_descent_s, None);
    }
}
