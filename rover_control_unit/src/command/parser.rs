//! Line protocol parser.
//!
//! One command per line; the first character selects it. Fixed letters
//! (`r s p g h e n d`) are built in, axis and servo letters come from the
//! configuration through [`CommandTable`].

use crate::motion::{AxisId, MoveError, MoveRequest};
use crate::odometry::estimator::Pose;
use heapless::Vec;
use rover_common::consts::{DRIVE_CHANNELS, MAX_AXES, SERIAL_LINE_MAX, SERVO_ANGLE_MAX};
use rover_common::control_unit::config::FirmwareConfig;
use rover_common::hal::types::DrivePwm;
use thiserror::Error;

/// Axes named by a homing command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeTarget {
    /// Every axis with a homing configuration.
    All,
    Axes(Vec<AxisId, MAX_AXES>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `r`
    ResetTicks,
    /// `s<x>;<y>;<deg>`
    SetPose(Pose),
    /// `p`
    QueryPose,
    /// `<axis><int>` or `g<axis><int>;...`
    Move(MoveRequest),
    /// `<servo><angle>`
    SetServo { servo: usize, angle: u16 },
    /// `h`, `h0`, `h<axes>`
    Home(HomeTarget),
    /// `e`
    EmergencyStop,
    /// `n`
    Enable,
    /// `d<lf>;<lr>;<rf>;<rr>`
    Drive(DrivePwm),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty line")]
    Empty,
    #[error("line longer than {SERIAL_LINE_MAX} bytes")]
    TooLong,
    #[error("unknown command '{0}'")]
    UnknownCommand(char),
    #[error("unexpected argument '{0}'")]
    Trailing(String),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("expected {expected} fields, got {got}")]
    FieldCount { expected: usize, got: usize },
    #[error("value {0} out of range")]
    OutOfRange(i64),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error("'{0}' is not an axis letter")]
    NotAnAxis(char),
}

/// What a configurable letter is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Axis(AxisId),
    Servo(usize),
}

/// Letter table built from the configuration.
#[derive(Debug, Clone)]
pub struct CommandTable {
    bindings: [Option<Binding>; 26],
}

impl CommandTable {
    /// Bind every configured axis and servo letter.
    ///
    /// Assumes a validated configuration (lowercase, unique, unreserved
    /// letters); anything else is skipped.
    pub fn from_config(config: &FirmwareConfig) -> Self {
        let mut bindings = [None; 26];
        let axes = config
            .axes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.letter, Binding::Axis(i)));
        let servos = config
            .servos
            .iter()
            .enumerate()
            .map(|(i, s)| (s.letter, Binding::Servo(i)));
        for (letter, binding) in axes.chain(servos) {
            if let Some(slot) = letter_index(letter).and_then(|i| bindings.get_mut(i)) {
                slot.get_or_insert(binding);
            }
        }
        Self { bindings }
    }

    pub fn binding(&self, letter: char) -> Option<Binding> {
        letter_index(letter).and_then(|i| self.bindings[i])
    }

    fn axis(&self, letter: char) -> Result<AxisId, CommandError> {
        match self.binding(letter) {
            Some(Binding::Axis(axis)) => Ok(axis),
            _ => Err(CommandError::NotAnAxis(letter)),
        }
    }

    /// Parse one received line.
    pub fn parse(&self, line: &str) -> Result<Command, CommandError> {
        let line = line.trim();
        if line.len() > SERIAL_LINE_MAX {
            return Err(CommandError::TooLong);
        }
        let mut chars = line.chars();
        let letter = chars.next().ok_or(CommandError::Empty)?;
        let args = chars.as_str();

        match letter {
            'r' => no_args(args).map(|()| Command::ResetTicks),
            'p' => no_args(args).map(|()| Command::QueryPose),
            'n' => no_args(args).map(|()| Command::Enable),
            'e' => match args {
                "" | "0" => Ok(Command::EmergencyStop),
                other => Err(CommandError::Trailing(other.to_string())),
            },
            's' => {
                let [x, y, deg] = fields::<3>(args)?.map(parse_float);
                Ok(Command::SetPose(Pose::from_degrees(x?, y?, deg?)))
            }
            'd' => {
                let mut channels = [0u8; DRIVE_CHANNELS];
                for (slot, field) in channels.iter_mut().zip(fields::<DRIVE_CHANNELS>(args)?) {
                    *slot = parse_bounded(field, u8::MAX.into())? as u8;
                }
                Ok(Command::Drive(DrivePwm::from_channels(channels)))
            }
            'g' => self.parse_group_move(args),
            'h' => self.parse_home(args),
            other => match self.binding(other) {
                Some(Binding::Axis(axis)) => {
                    Ok(Command::Move(MoveRequest::single(axis, parse_int(args)?)))
                }
                Some(Binding::Servo(servo)) => Ok(Command::SetServo {
                    servo,
                    angle: parse_bounded(args, SERVO_ANGLE_MAX.into())? as u16,
                }),
                None => Err(CommandError::UnknownCommand(other)),
            },
        }
    }

    fn parse_group_move(&self, args: &str) -> Result<Command, CommandError> {
        let mut request = MoveRequest::new();
        for item in args.split(';') {
            let mut chars = item.chars();
            let letter = chars.next().ok_or(CommandError::Move(MoveError::Empty))?;
            let axis = self.axis(letter)?;
            request.push(axis, parse_int(chars.as_str())?)?;
        }
        Ok(Command::Move(request))
    }

    fn parse_home(&self, args: &str) -> Result<Command, CommandError> {
        if args.is_empty() || args == "0" {
            return Ok(Command::Home(HomeTarget::All));
        }
        let mut axes = Vec::new();
        for letter in args.chars() {
            let axis = self.axis(letter)?;
            if axes.contains(&axis) {
                return Err(MoveError::DuplicateAxis(axis).into());
            }
            axes.push(axis).map_err(|_| MoveError::TooManyAxes)?;
        }
        Ok(Command::Home(HomeTarget::Axes(axes)))
    }
}

fn letter_index(letter: char) -> Option<usize> {
    letter
        .is_ascii_lowercase()
        .then(|| (letter as u8 - b'a') as usize)
}

fn no_args(args: &str) -> Result<(), CommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandError::Trailing(args.to_string()))
    }
}

fn fields<const N: usize>(args: &str) -> Result<[&str; N], CommandError> {
    let mut out = [""; N];
    let mut got = 0;
    for field in args.split(';') {
        if got < N {
            out[got] = field;
        }
        got += 1;
    }
    if got == N {
        Ok(out)
    } else {
        Err(CommandError::FieldCount { expected: N, got })
    }
}

fn parse_int(s: &str) -> Result<i32, CommandError> {
    s.trim()
        .parse()
        .map_err(|_| CommandError::InvalidNumber(s.to_string()))
}

fn parse_bounded(s: &str, max: i64) -> Result<i64, CommandError> {
    let value: i64 = s
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidNumber(s.to_string()))?;
    if (0..=max).contains(&value) {
        Ok(value)
    } else {
        Err(CommandError::OutOfRange(value))
    }
}

fn parse_float(s: &str) -> Result<f64, CommandError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::InvalidNumber(s.to_string()))
}
