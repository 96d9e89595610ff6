//! Simulated tracking demo: plays six anchor-layout scenarios with an
//! elliptical tag trajectory and synthetic range noise through the full
//! solve-and-filter pipeline, printing per-scenario error summaries.
//!
//! Room frame is y-up (x, height, depth); the solver works z-up. All
//! timing is simulated; nothing here sleeps or touches the network.

use std::f64::consts::TAU;

use rand::prelude::*;

use uwb_fusion::core::geometry::distance;
use uwb_fusion::{
    measurement_from_ground_truth, room_to_solver, solver_to_room, AnchorSet, FilterConfig,
    FusionConfig, Point3, SolverConfig, TagTracker,
};

const SCENARIO_DURATION_S: f64 = 10.0;
const NUM_SCENARIOS: usize = 6;
const DT: f64 = 0.1;
const NOISE_STD_M: f64 = 0.05;
const LOG_EVERY_N: usize = 10;

/// Anchor layouts in the room frame (x, height, depth), meters
fn anchors_for_scenario(idx: usize) -> [Point3; 4] {
    match idx {
        0 => [
            Point3::new(0.0, 2.8, 0.0),
            Point3::new(12.0, 2.8, 0.0),
            Point3::new(0.0, 2.8, 12.0),
            Point3::new(12.0, 2.8, 12.0),
        ],
        1 => [
            Point3::new(1.0, 2.8, 1.0),
            Point3::new(11.0, 2.8, 1.0),
            Point3::new(1.0, 2.8, 11.0),
            Point3::new(11.0, 2.8, 11.0),
        ],
        2 => [
            Point3::new(0.0, 2.8, 0.0),
            Point3::new(12.0, 2.8, 0.0),
            Point3::new(0.0, 1.4, 12.0),
            Point3::new(12.0, 1.4, 12.0),
        ],
        3 => [
            Point3::new(0.0, 2.8, 0.0),
            Point3::new(12.0, 1.4, 0.0),
            Point3::new(0.0, 2.0, 12.0),
            Point3::new(12.0, 2.8, 12.0),
        ],
        // Nearly collinear layouts: stress the solver's geometry handling
        4 => [
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(4.0, 2.0, 0.0),
            Point3::new(8.0, 2.0, 0.0),
            Point3::new(12.0, 2.2, 2.0),
        ],
        _ => [
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.5, 2.0, 0.1),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(1.5, 2.1, 0.1),
        ],
    }
}

/// Elliptical walk around the room center, with a slight height bob
fn tag_trajectory(seg_t: f64, idx: usize) -> Point3 {
    let (cx, cz) = (6.0, 6.0);
    let radii = [
        (5.0, 4.2),
        (5.2, 2.8),
        (4.2, 5.2),
        (4.8, 4.8),
        (5.6, 2.0),
        (5.6, 2.0),
    ];
    let (rx, rz) = radii[idx];
    let ang = TAU * seg_t / SCENARIO_DURATION_S;

    let x = cx + rx * ang.cos();
    let z = cz + rz * ang.sin();
    let y = 1.55 + 0.18 * (1.2 * ang).sin();

    Point3::new(x.clamp(0.6, 11.4), y.clamp(1.2, 2.2), z.clamp(0.6, 11.4))
}

fn main() {
    println!("===== Hybrid LM + GMC-Kalman tracking demo =====\n");

    let mut rng = StdRng::seed_from_u64(0xF0CA);
    let mut tracker = TagTracker::new(
        FusionConfig::default(),
        SolverConfig {
            z_min: 0.2,
            z_max: 3.5,
            ..SolverConfig::default()
        },
        FilterConfig {
            process_var: 0.15,
            meas_var: 0.01,
            ..FilterConfig::default()
        },
    );

    let cycles_per_scenario = (SCENARIO_DURATION_S / DT) as usize;

    for scenario in 0..NUM_SCENARIOS {
        let room_anchors = anchors_for_scenario(scenario);
        let anchors = AnchorSet::new([
            room_to_solver(room_anchors[0]),
            room_to_solver(room_anchors[1]),
            room_to_solver(room_anchors[2]),
            room_to_solver(room_anchors[3]),
        ]);

        tracker.restart();

        let mut errors_cm: Vec<f64> = Vec::with_capacity(cycles_per_scenario);

        for step in 0..cycles_per_scenario {
            let t = step as f64 * DT;
            let gt_room = tag_trajectory(t, scenario);
            let gt = room_to_solver(gt_room);

            let s = measurement_from_ground_truth(&anchors, &gt, NOISE_STD_M, &mut rng);
            let out = tracker.step(&anchors, &s);

            let est_room = solver_to_room(out.position);
            let err_cm = 100.0 * distance(&est_room, &gt_room);
            errors_cm.push(err_cm);

            if (step + 1) % LOG_EVERY_N == 0 {
                let flag = if out.did_reset {
                    "RST"
                } else if out.gated {
                    "GAT"
                } else {
                    "   "
                };
                println!(
                    "[t={:5.2}s | S{}] it={:3} cost={:6.3} innov={:4.2}m {} err={:5.1}cm",
                    t,
                    scenario,
                    out.solver.iterations,
                    out.solver.final_cost,
                    out.innovation_m,
                    flag,
                    err_cm
                );
            }
        }

        let mut sorted = errors_cm.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mean = errors_cm.iter().sum::<f64>() / errors_cm.len() as f64;
        let p90 = sorted[(0.9 * sorted.len() as f64) as usize];
        let max = sorted.last().copied().unwrap_or(0.0);

        println!(
            "=== S{scenario} DONE | mean={mean:5.1} cm | p90={p90:5.1} cm | max={max:5.1} cm | N={}\n",
            errors_cm.len()
        );
    }
}
