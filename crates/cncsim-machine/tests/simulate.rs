//! End-to-end runs: program text in, tool path out.

use approx::assert_abs_diff_eq;
use cncsim_gcode::{parse_program, write_path, GcodeError, ParseOptions, Word};
use cncsim_machine::{Machine, SimConfig, SimError, Simulator};
use cncsim_math::Point3;

fn run(source: &str, config: SimConfig) -> Simulator {
    let program = parse_program(source, &ParseOptions::default()).unwrap();
    let mut sim = Simulator::new(config).unwrap();
    sim.run(&program).unwrap();
    sim
}

#[test]
fn straight_move_ends_exactly_on_target() {
    for time_slice in [1e-4, 0.001, 0.0137, 0.5, 3.0, 1000.0] {
        let config = SimConfig {
            time_slice,
            ..Default::default()
        };
        let sim = run("G90\nG1 X10 Y0 F100\n", config);
        assert_eq!(sim.path().last(), Some(&Point3::new(10.0, 0.0, 0.0)));
    }
}

#[test]
fn odd_targets_are_reached_exactly() {
    let sim = run(
        "G1 X0.1 Y-0.7 Z3.3 F37\nG1 X-12.345 Z0.001\nG0 Y100.05\n",
        SimConfig::default(),
    );
    assert_eq!(
        sim.machine().head().position(),
        Point3::new(-12.345, 100.05, 0.001)
    );
}

#[test]
fn written_path_reparses_to_the_same_points() {
    let source = "\
%
(profile)
G21 G17 G90
G0 Z5
G0 X-5 Y0
G1 Z-1 F200
G2 X5 Y0 I5 J0 F400
G3 X0 Y5 R5
G1 X0 Y0
M30
%
";
    let sim = run(source, SimConfig::default());
    let path = sim.path().to_vec();
    assert!(path.len() > 100);

    let mut buf = Vec::new();
    write_path(&path, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let reparsed = parse_program(&text, &ParseOptions::default()).unwrap();

    assert_eq!(reparsed.len(), path.len());
    for (cmd, p) in reparsed.iter().zip(&path) {
        let q = Point3::new(
            cmd.coords.value(Word::X),
            cmd.coords.value(Word::Y),
            cmd.coords.value(Word::Z),
        );
        assert_abs_diff_eq!((q - p).norm(), 0.0, epsilon = 1e-12);
    }

    // Replaying the written path lands where the original run ended.
    let replay = run(&format!("F1000\n{text}"), SimConfig::default());
    assert_eq!(replay.path().last(), path.last());
}

#[test]
fn arc_samples_stay_within_tolerance() {
    let tolerance = 0.002;
    let config = SimConfig {
        arc_tolerance: tolerance,
        time_slice: 0.0001,
        ..Default::default()
    };
    let sim = run("G1 X20 F600\nG2 X-20 Y0 I-20 J0\n", config);
    let arc: Vec<Point3> = sim
        .path()
        .iter()
        .copied()
        .skip_while(|p| p.x < 20.0)
        .collect();
    assert!(arc.len() > 10);
    for pair in arc.windows(2) {
        let mid = Point3::from((pair[0].coords + pair[1].coords) / 2.0);
        let deviation = 20.0 - mid.coords.norm();
        assert!(deviation <= tolerance + 1e-9, "deviation {deviation}");
        // Clockwise from +X passes through -Y.
        assert!(pair[1].y <= 1e-9);
    }
}

#[test]
fn parse_errors_stop_before_simulation() {
    let err = parse_program("G90\nG1 X10\nG999\n", &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, GcodeError::UnknownCode { line: 3, .. }));
    let err = parse_program("X\n", &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, GcodeError::ArgumentParse { .. }));
}

#[test]
fn simulation_errors_name_the_line() {
    let program = parse_program("G1 X1 F100\nG1 X2\nT1.5\nG1 X3\n", &ParseOptions::default()).unwrap();
    let mut sim = Simulator::new(SimConfig::default()).unwrap();
    let err = sim.run(&program).unwrap_err();
    assert!(matches!(err, SimError::ArgumentParse { line: 3, .. }));
    assert_eq!(sim.path().last(), Some(&Point3::new(2.0, 0.0, 0.0)));
}
