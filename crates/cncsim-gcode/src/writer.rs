//! Tool path output as linear-move instructions.

use std::io::Write;

use cncsim_math::Point3;

/// Format one path point as `G1 X<x> Y<y> Z<z>`.
///
/// Values use the shortest representation that parses back to the same
/// `f64`, and never use exponent notation, so the line re-parses exactly.
pub fn format_move(p: &Point3) -> String {
    format!("G1 X{} Y{} Z{}", p.x, p.y, p.z)
}

/// Write every point of a path, one instruction per line.
pub fn write_path<W: Write>(points: &[Point3], mut out: W) -> std::io::Result<()> {
    for p in points {
        writeln!(out, "{}", format_move(p))?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{parse_program, ParseOptions};
    use crate::command::{CommandKind, Word};

    #[test]
    fn test_format_move() {
        assert_eq!(format_move(&Point3::new(10.0, 0.0, -2.5)), "G1 X10 Y0 Z-2.5");
        assert_eq!(format_move(&Point3::new(1e-7, 0.1, 3.0)), "G1 X0.0000001 Y0.1 Z3");
    }

    #[test]
    fn test_path_round_trip() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0 / 3.0, -2.0 / 7.0, 5.5),
            Point3::new(123.456789, 1e-9, -0.0),
            Point3::new(10.0, 0.0, 0.0),
        ];
        let mut buf = Vec::new();
        write_path(&points, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), points.len());

        let program = parse_program(&text, &ParseOptions::default()).unwrap();
        assert_eq!(program.len(), points.len());
        for (cmd, p) in program.iter().zip(&points) {
            assert_eq!(cmd.kind, CommandKind::Linear);
            assert_eq!(cmd.coords.get(Word::X), Some(p.x));
            assert_eq!(cmd.coords.get(Word::Y), Some(p.y));
            assert_eq!(cmd.coords.get(Word::Z), Some(p.z));
        }
    }
}
