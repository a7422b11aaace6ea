//! Commands, coordinate snapshots and the program they form.

use serde::{Deserialize, Serialize};

use crate::lexer::Token;

/// A word letter that carries a value in the coordinate snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Word {
    /// X axis target.
    X,
    /// Y axis target.
    Y,
    /// Z axis target.
    Z,
    /// A (rotary about X) target.
    A,
    /// B (rotary about Y) target.
    B,
    /// C (rotary about Z) target.
    C,
    /// Feed rate.
    F,
    /// Tool length offset index.
    H,
    /// Arc center offset along X.
    I,
    /// Arc center offset along Y.
    J,
    /// Arc center offset along Z.
    K,
    /// Arc radius.
    R,
}

impl Word {
    /// All words in snapshot order.
    pub const ALL: [Word; 12] = [
        Word::X,
        Word::Y,
        Word::Z,
        Word::A,
        Word::B,
        Word::C,
        Word::F,
        Word::H,
        Word::I,
        Word::J,
        Word::K,
        Word::R,
    ];

    /// Map an uppercase letter to its word.
    pub fn from_letter(c: char) -> Option<Self> {
        Some(match c {
            'X' => Word::X,
            'Y' => Word::Y,
            'Z' => Word::Z,
            'A' => Word::A,
            'B' => Word::B,
            'C' => Word::C,
            'F' => Word::F,
            'H' => Word::H,
            'I' => Word::I,
            'J' => Word::J,
            'K' => Word::K,
            'R' => Word::R,
            _ => return None,
        })
    }

    /// True for the six axis words.
    pub fn is_axis(self) -> bool {
        matches!(
            self,
            Word::X | Word::Y | Word::Z | Word::A | Word::B | Word::C
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A set of words, used to record which words a logical unit set explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Words(u16);

impl Words {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Add a word.
    pub fn insert(&mut self, word: Word) {
        self.0 |= 1 << word.index();
    }

    /// Membership test.
    pub fn contains(&self, word: Word) -> bool {
        self.0 & (1 << word.index()) != 0
    }

    /// True if no word is present.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if any axis word is present.
    pub fn has_axis(&self) -> bool {
        Word::ALL
            .iter()
            .any(|w| w.is_axis() && self.contains(*w))
    }
}

/// A full coordinate/parameter snapshot.
///
/// A value is `None` until some command in the program sets it; after that it
/// is carried forward to every later command until overridden. An explicit
/// zero is therefore distinguishable from an axis that was never given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    values: [Option<f64>; 12],
}

impl Coordinate {
    /// An empty snapshot (nothing set).
    pub fn new() -> Self {
        Self::default()
    }

    /// The value of a word, if it has been set.
    pub fn get(&self, word: Word) -> Option<f64> {
        self.values[word.index()]
    }

    /// The value of a word, zero when unset.
    pub fn value(&self, word: Word) -> f64 {
        self.get(word).unwrap_or(0.0)
    }

    /// Set a word.
    pub fn set(&mut self, word: Word, value: f64) {
        self.values[word.index()] = Some(value);
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, word: Word, value: f64) -> Self {
        self.set(word, value);
        self
    }
}

/// Active arc plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plane {
    /// G17: arcs in XY, Z constant.
    Xy,
    /// G18: arcs in XZ, Y constant.
    Xz,
    /// G19: arcs in YZ, X constant.
    Yz,
}

/// Linear unit system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    /// G20.
    Inch,
    /// G21.
    Millimeter,
}

impl Units {
    /// Millimetres per program unit.
    pub fn to_mm(self) -> f64 {
        match self {
            Units::Inch => 25.4,
            Units::Millimeter => 1.0,
        }
    }
}

/// Feed-rate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedMode {
    /// G93: `F` is the reciprocal of the move time in minutes.
    InverseTime,
    /// G94: `F` is distance per minute.
    PerMinute,
    /// G95: `F` is distance per spindle revolution.
    PerRevolution,
}

/// What a committed command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// G0 rapid positioning.
    Rapid,
    /// G1 linear interpolation.
    Linear,
    /// G2 clockwise arc.
    ArcCw,
    /// G3 counterclockwise arc.
    ArcCcw,
    /// M3 (clockwise) / M4 (counterclockwise) spindle start.
    SpindleOn {
        /// Spindle direction.
        clockwise: bool,
    },
    /// M5 spindle stop.
    SpindleOff,
    /// S spindle speed; the value is the token's numeric suffix.
    SpindleSpeed,
    /// T tool select; the tool number is the token's numeric suffix.
    ToolSelect,
    /// M6 tool change to the selected tool.
    ToolChange,
    /// G17/G18/G19.
    Plane(Plane),
    /// G93/G94/G95.
    FeedMode(FeedMode),
    /// G90 absolute distance mode.
    Absolute,
    /// G20/G21.
    Units(Units),
    /// M2/M30 program end.
    ProgramEnd,
    /// Parameter words without a code, such as a feed rate on its own line.
    NoOp,
}

impl CommandKind {
    /// True for rapid, linear and arc moves.
    pub fn is_motion(self) -> bool {
        matches!(
            self,
            CommandKind::Rapid | CommandKind::Linear | CommandKind::ArcCw | CommandKind::ArcCcw
        )
    }
}

/// One committed command.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// What the command does.
    pub kind: CommandKind,
    /// The token that produced the command (the code word, or the carried
    /// motion code for modal motion lines).
    pub token: Token,
    /// Full coordinate snapshot in effect for this command.
    pub coords: Coordinate,
    /// Words set explicitly on this command's line.
    pub words: Words,
}

impl Command {
    /// Source line of the command's token.
    pub fn line(&self) -> usize {
        self.token.line
    }
}

/// An append-only, program-ordered list of commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    commands: Vec<Command>,
    token_count: usize,
}

impl Program {
    pub(crate) fn new(commands: Vec<Command>, token_count: usize) -> Self {
        Self {
            commands,
            token_count,
        }
    }

    /// The commands in program order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Iterate over the commands in program order.
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if the program has no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of tokens the program was built from.
    pub fn token_count(&self) -> usize {
        self.token_count
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_unset_vs_zero() {
        let c = Coordinate::new().with(Word::X, 0.0);
        assert_eq!(c.get(Word::X), Some(0.0));
        assert_eq!(c.get(Word::Y), None);
        assert_eq!(c.value(Word::Y), 0.0);
    }

    #[test]
    fn test_words_set() {
        let mut w = Words::empty();
        assert!(w.is_empty());
        w.insert(Word::F);
        assert!(!w.has_axis());
        w.insert(Word::Z);
        assert!(w.has_axis());
        assert!(w.contains(Word::Z));
        assert!(!w.contains(Word::X));
    }

    #[test]
    fn test_word_letters() {
        for w in Word::ALL {
            let letter = format!("{w:?}").chars().next().unwrap();
            assert_eq!(Word::from_letter(letter), Some(w));
        }
        assert_eq!(Word::from_letter('G'), None);
    }
}
