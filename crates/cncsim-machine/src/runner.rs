//! Command dispatch loop.

use cncsim_gcode::{Command, CommandKind, FeedMode, Plane, Program, Token, Units, Word, MAX_TOOL};
use cncsim_math::{Point3, Tolerance, Vec3};
use log::{debug, info};
use serde::Serialize;

use crate::arc::{arc_move, ArcDirection, ArcGeometry};
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::linear::linear_move;
use crate::machine::{Machine, Simple3Axis, SpindleDirection};

/// A tool change and where on the path it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolChange {
    /// Tool now in the spindle.
    pub tool: u32,
    /// Index of the path point at which the tool took over.
    pub path_index: usize,
    /// Source line of the change.
    pub line: usize,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimReport {
    /// Commands executed.
    pub commands_run: usize,
    /// Motion commands among them.
    pub moves: usize,
    /// Points on the tool path.
    pub path_points: usize,
    /// Tool changes in path order.
    pub tool_changes: Vec<ToolChange>,
    /// True if M2/M30 stopped the run.
    pub program_ended: bool,
    /// Head position after the last command.
    pub final_position: [f64; 3],
}

/// Whether the loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the next command.
    Continue,
    /// Program end reached.
    End,
}

/// Walks a program, driving a machine.
#[derive(Debug)]
pub struct Simulator<M: Machine = Simple3Axis> {
    config: SimConfig,
    machine: M,
    tolerance: Tolerance,
    tool_changes: Vec<ToolChange>,
    commands_run: usize,
    moves: usize,
    ended: bool,
}

impl Simulator<Simple3Axis> {
    /// A simulator for a three-axis mill at the origin.
    pub fn new(config: SimConfig) -> Result<Self> {
        let machine = Simple3Axis::new(config.rapid_feed_rate);
        Self::with_machine(config, machine)
    }
}

fn at_line(err: SimError, line: usize) -> SimError {
    match err {
        SimError::GeometryDegeneracy(msg) => {
            SimError::GeometryDegeneracy(format!("line {line}: {msg}"))
        }
        other => other,
    }
}

fn parse_spindle_speed(token: &Token) -> Result<i64> {
    let suffix = token.suffix();
    suffix
        .parse::<i64>()
        .ok()
        .or_else(|| {
            suffix
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && v.abs() < i64::MAX as f64)
                .map(|v| v.round() as i64)
        })
        .ok_or_else(|| {
            SimError::argument(&token.text, token.line, token.col, "malformed spindle speed")
        })
}

fn parse_tool(token: &Token) -> Result<u32> {
    match token.suffix().parse::<u32>() {
        Ok(tool) if tool <= MAX_TOOL => Ok(tool),
        Ok(_) => Err(SimError::argument(
            &token.text,
            token.line,
            token.col,
            format!("tool number above {MAX_TOOL}"),
        )),
        Err(_) => Err(SimError::argument(
            &token.text,
            token.line,
            token.col,
            "tool number must be a whole number",
        )),
    }
}

impl<M: Machine> Simulator<M> {
    /// Validate `config`, reset `machine` and wrap it.
    pub fn with_machine(config: SimConfig, mut machine: M) -> Result<Self> {
        config.validate()?;
        machine.reset();
        Ok(Self {
            config,
            machine,
            tolerance: Tolerance::DEFAULT,
            tool_changes: Vec::new(),
            commands_run: 0,
            moves: 0,
            ended: false,
        })
    }

    /// Settings in use.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The machine.
    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Tool path so far.
    pub fn path(&self) -> &[Point3] {
        self.machine.head().path()
    }

    /// Tool changes so far.
    pub fn tool_changes(&self) -> &[ToolChange] {
        &self.tool_changes
    }

    /// Execute every command until the end of the program or M2/M30.
    ///
    /// Stops at the first failing command; the path and machine state are
    /// left as the previous command left them.
    pub fn run(&mut self, program: &Program) -> Result<SimReport> {
        info!(
            "start at {:?}, {} commands",
            self.machine.head().position(),
            program.len()
        );
        for cmd in program {
            if self.execute(cmd)? == Flow::End {
                break;
            }
        }
        let report = self.report();
        info!(
            "ran {} commands, {} path points",
            report.commands_run, report.path_points
        );
        Ok(report)
    }

    /// Execute one command.
    pub fn execute(&mut self, cmd: &Command) -> Result<Flow> {
        if self.ended {
            return Ok(Flow::End);
        }
        let saved_feed = self.machine.feed_rate();
        let flow = match self.dispatch(cmd) {
            Ok(flow) => flow,
            Err(err) => {
                self.machine.set_feed_rate(saved_feed);
                return Err(at_line(err, cmd.line()));
            }
        };
        self.commands_run += 1;
        if self.config.trace_moves {
            debug!(
                "after {} (line {}): {:?} F {}",
                cmd.token.text,
                cmd.line(),
                self.machine.head().position(),
                self.machine.feed_rate()
            );
        }
        Ok(flow)
    }

    /// Snapshot of the run so far.
    pub fn report(&self) -> SimReport {
        let p = self.machine.head().position();
        SimReport {
            commands_run: self.commands_run,
            moves: self.moves,
            path_points: self.machine.head().point_count(),
            tool_changes: self.tool_changes.clone(),
            program_ended: self.ended,
            final_position: [p.x, p.y, p.z],
        }
    }

    fn dispatch(&mut self, cmd: &Command) -> Result<Flow> {
        let scale = self.machine.units().unwrap_or(Units::Millimeter).to_mm();
        // The machine keeps the rate in mm, so only a freshly written F is converted.
        if cmd.words.contains(Word::F) {
            let f = cmd.coords.value(Word::F);
            let rate = match self.machine.feed_mode() {
                FeedMode::InverseTime => f,
                FeedMode::PerMinute | FeedMode::PerRevolution => f * scale,
            };
            self.machine.set_feed_rate(rate);
        }

        match cmd.kind {
            CommandKind::Rapid => {
                let target = self.target(cmd, scale);
                let rate = self.machine.rapid_feed_rate() / 60.0;
                linear_move(self.machine.head_mut(), target, rate, self.config.time_slice)?;
                self.moves += 1;
            }
            CommandKind::Linear => {
                let target = self.target(cmd, scale);
                let length = (target - self.machine.head().position()).norm();
                if length > 0.0 {
                    let rate = self.feed_per_second(length, cmd)?;
                    linear_move(self.machine.head_mut(), target, rate, self.config.time_slice)?;
                }
                self.moves += 1;
            }
            CommandKind::ArcCw => self.arc(cmd, scale, ArcDirection::Clockwise)?,
            CommandKind::ArcCcw => self.arc(cmd, scale, ArcDirection::CounterClockwise)?,
            CommandKind::SpindleOn { clockwise } => {
                self.machine.set_spindle_direction(if clockwise {
                    SpindleDirection::Clockwise
                } else {
                    SpindleDirection::CounterClockwise
                });
            }
            CommandKind::SpindleOff => {
                self.machine.set_spindle_speed(0);
                self.machine.set_spindle_direction(SpindleDirection::Stopped);
            }
            CommandKind::SpindleSpeed => {
                let speed = parse_spindle_speed(&cmd.token)?;
                self.machine.set_spindle_speed(speed);
            }
            CommandKind::ToolSelect => {
                let tool = parse_tool(&cmd.token)?;
                self.machine.select_tool(tool);
            }
            CommandKind::ToolChange => {
                self.machine.change_tool();
                let change = ToolChange {
                    tool: self.machine.active_tool(),
                    path_index: self.machine.head().point_count().saturating_sub(1),
                    line: cmd.line(),
                };
                info!("tool change to T{} at line {}", change.tool, change.line);
                self.tool_changes.push(change);
            }
            CommandKind::Plane(plane) => self.machine.select_plane(plane),
            CommandKind::FeedMode(mode) => self.machine.set_feed_mode(mode),
            CommandKind::Units(units) => self.machine.set_units(units),
            CommandKind::Absolute => debug!("line {}: absolute positioning", cmd.line()),
            CommandKind::ProgramEnd => {
                info!("program end at line {}", cmd.line());
                self.ended = true;
                return Ok(Flow::End);
            }
            CommandKind::NoOp => {}
        }
        Ok(Flow::Continue)
    }

    /// Axis target: words on this line scaled to mm, other axes stay put.
    fn target(&self, cmd: &Command, scale: f64) -> Point3 {
        let current = self.machine.head().position();
        let axis = |word: Word, here: f64| {
            if cmd.words.contains(word) {
                cmd.coords.value(word) * scale
            } else {
                here
            }
        };
        Point3::new(
            axis(Word::X, current.x),
            axis(Word::Y, current.y),
            axis(Word::Z, current.z),
        )
    }

    /// Feed rate in mm/s for a cutting move of `length` mm.
    fn feed_per_second(&self, length: f64, cmd: &Command) -> Result<f64> {
        let feed = self.machine.feed_rate();
        let per_minute = match self.machine.feed_mode() {
            FeedMode::PerMinute => feed,
            FeedMode::InverseTime => feed * length,
            FeedMode::PerRevolution => feed * self.machine.spindle_speed().unsigned_abs() as f64,
        };
        let rate = per_minute / 60.0;
        if rate <= 0.0 || !rate.is_finite() {
            return Err(SimError::ZeroFeedRate { line: cmd.line() });
        }
        Ok(rate)
    }

    fn arc(&mut self, cmd: &Command, scale: f64, direction: ArcDirection) -> Result<()> {
        let start = self.machine.head().position();
        let end = self.target(cmd, scale);
        let plane = self.machine.plane().unwrap_or(Plane::Xy);

        // Offsets and radius apply only to the line that gives them.
        let arc = if cmd.words.contains(Word::R) {
            let radius = cmd.coords.value(Word::R) * scale;
            ArcGeometry::from_radius(start, end, radius, plane, direction, &self.tolerance)?
        } else {
            let offset = |word: Word| {
                if cmd.words.contains(word) {
                    cmd.coords.value(word) * scale
                } else {
                    0.0
                }
            };
            let center = start + Vec3::new(offset(Word::I), offset(Word::J), offset(Word::K));
            ArcGeometry::from_center(start, end, center, plane, direction, &self.tolerance)?
        };

        let rate = self.feed_per_second(arc.length(), cmd)?;
        arc_move(
            self.machine.head_mut(),
            &arc,
            rate * self.config.time_slice,
            self.config.arc_tolerance,
        )?;
        self.moves += 1;
        Ok(())
    }
}
