//! Servo bookkeeping and drive motor outputs.

use heapless::{String, Vec};
use rover_common::consts::{MAX_SERVOS, SERVO_ANGLE_MAX};
use rover_common::control_unit::config::ServoConfig;
use rover_common::hal::types::{HalCommands, ServoCommand};
use thiserror::Error;
use tracing::{debug, warn};

const SERVO_NAME_MAX: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ServoError {
    #[error("servo {0} does not exist")]
    UnknownServo(usize),
    #[error("angle {0} exceeds {SERVO_ANGLE_MAX}")]
    AngleOutOfRange(u16),
    #[error("servo {0} is detached")]
    Detached(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Servo {
    name: String<SERVO_NAME_MAX>,
    angle: u16,
    attached: bool,
    home_angle: u16,
}

impl Servo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn angle(&self) -> u16 {
        self.angle
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// All configured servos, attached at their home angle on creation.
#[derive(Debug, Clone, Default)]
pub struct ServoBank {
    servos: Vec<Servo, MAX_SERVOS>,
}

impl ServoBank {
    pub fn from_config(configs: &[ServoConfig]) -> Self {
        let mut servos = Vec::new();
        for cfg in configs {
            let mut name = String::new();
            for c in cfg.name.chars() {
                if name.push(c).is_err() {
                    break;
                }
            }
            let servo = Servo {
                name,
                angle: cfg.home_angle,
                attached: true,
                home_angle: cfg.home_angle,
            };
            if servos.push(servo).is_err() {
                warn!(name = %cfg.name, "servo table full, ignoring");
            }
        }
        Self { servos }
    }

    /// Command a new angle on an attached servo.
    pub fn set_angle(&mut self, index: usize, angle: u16) -> Result<(), ServoError> {
        if angle > SERVO_ANGLE_MAX {
            return Err(ServoError::AngleOutOfRange(angle));
        }
        let servo = self
            .servos
            .get_mut(index)
            .ok_or(ServoError::UnknownServo(index))?;
        if !servo.attached {
            return Err(ServoError::Detached(index));
        }
        servo.angle = angle;
        debug!(servo = %servo.name, angle, "servo");
        Ok(())
    }

    /// Drop holding torque on every servo; angles are kept.
    pub fn detach_all(&mut self) {
        for servo in self.servos.iter_mut() {
            servo.attached = false;
        }
    }

    pub fn attach_all(&mut self) {
        for servo in self.servos.iter_mut() {
            servo.attached = true;
        }
    }

    /// Return every servo to its home angle.
    pub fn home_all(&mut self) {
        for servo in self.servos.iter_mut() {
            servo.angle = servo.home_angle;
        }
    }

    pub fn get(&self, index: usize) -> Option<&Servo> {
        self.servos.get(index)
    }

    pub fn len(&self) -> usize {
        self.servos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servos.is_empty()
    }

    /// Write servo outputs into `commands`.
    pub fn write_commands(&self, commands: &mut HalCommands) {
        for (slot, servo) in commands.servos.iter_mut().zip(self.servos.iter()) {
            *slot = ServoCommand {
                attached: servo.attached,
                angle: servo.angle,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> ServoBank {
        ServoBank::from_config(&[
            ServoConfig {
                name: "grip".to_string(),
                letter: 'k',
                home_angle: 90,
            },
            ServoConfig {
                name: "flag".to_string(),
                letter: 't',
                home_angle: 0,
            },
        ])
    }

    #[test]
    fn starts_attached_at_home() {
        let b = bank();
        assert_eq!(b.len(), 2);
        let grip = b.get(0).unwrap();
        assert_eq!(grip.name(), "grip");
        assert_eq!(grip.angle(), 90);
        assert!(grip.is_attached());
    }

    #[test]
    fn set_angle_checks() {
        let mut b = bank();
        assert_eq!(b.set_angle(1, 180), Ok(()));
        assert_eq!(b.get(1).unwrap().angle(), 180);
        assert_eq!(b.set_angle(1, 181), Err(ServoError::AngleOutOfRange(181)));
        assert_eq!(b.set_angle(5, 10), Err(ServoError::UnknownServo(5)));

        b.detach_all();
        assert_eq!(b.set_angle(0, 10), Err(ServoError::Detached(0)));
        assert_eq!(b.get(0).unwrap().angle(), 90);
    }

    #[test]
    fn detach_then_attach_keeps_angle() {
        let mut b = bank();
        b.set_angle(0, 45).unwrap();
        b.detach_all();
        let mut cmd = HalCommands::default();
        b.write_commands(&mut cmd);
        assert!(!cmd.servos[0].attached);
        assert_eq!(cmd.servos[0].angle, 45);

        b.attach_all();
        b.home_all();
        b.write_commands(&mut cmd);
        assert!(cmd.servos[0].attached);
        assert_eq!(cmd.servos[0].angle, 90);
        assert!(!cmd.servos[MAX_SERVOS - 1].attached);
    }
}
