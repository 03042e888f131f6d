use trialc_core::{ConfigurationError, Event, MAX_PORT, OutputAction, PortId, PortRole, Side};

/// Full PWM intensity for port illumination
pub const FULL_INTENSITY: u8 = 255;

/// Physical ports assigned to the left, center and right roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    left: PortId,
    center: PortId,
    right: PortId,
}

impl PortMapping {
    /// Decodes a three-digit code such as `123` or `312` (left, center,
    /// right). The three roles must land on distinct channels.
    pub fn from_code(code: u32) -> Result<Self, ConfigurationError> {
        if !(100..=999).contains(&code) {
            return Err(ConfigurationError::PortCodeDigits { code });
        }
        let decode = |role: PortRole, digit: u32| {
            u8::try_from(digit)
                .ok()
                .and_then(PortId::new)
                .ok_or(ConfigurationError::PortOutOfRange {
                    role,
                    channel: digit,
                    max: MAX_PORT,
                })
        };
        let mapping = Self {
            left: decode(PortRole::Left, code / 100)?,
            center: decode(PortRole::Center, code / 10 % 10)?,
            right: decode(PortRole::Right, code % 10)?,
        };
        for (i, first) in PortRole::ALL.iter().enumerate() {
            for second in &PortRole::ALL[i + 1..] {
                if mapping.port(*first) == mapping.port(*second) {
                    return Err(ConfigurationError::PortCollision {
                        first: *first,
                        second: *second,
                        port: mapping.port(*first),
                    });
                }
            }
        }
        Ok(mapping)
    }

    pub fn port(&self, role: PortRole) -> PortId {
        match role {
            PortRole::Left => self.left,
            PortRole::Center => self.center,
            PortRole::Right => self.right,
        }
    }

    pub fn side(&self, side: Side) -> PortId {
        self.port(side.into())
    }

    pub fn all(&self) -> [PortId; 3] {
        [self.left, self.center, self.right]
    }

    pub fn entered(&self, role: PortRole) -> Event {
        Event::PortIn(self.port(role))
    }

    pub fn exited(&self, role: PortRole) -> Event {
        Event::PortOut(self.port(role))
    }

    pub fn light(&self, role: PortRole, intensity: u8) -> OutputAction {
        OutputAction::Illuminate {
            port: self.port(role),
            intensity,
        }
    }

    pub fn valve(&self, side: Side, duration_s: f64) -> OutputAction {
        OutputAction::OpenValve {
            port: self.side(side),
            duration_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_roles_in_left_center_right_order() {
        let ports = PortMapping::from_code(312).unwrap();
        assert_eq!(ports.port(PortRole::Left).channel(), 3);
        assert_eq!(ports.port(PortRole::Center).channel(), 1);
        assert_eq!(ports.side(Side::Right).channel(), 2);
        assert_eq!(ports.entered(PortRole::Center).to_string(), "Port1In");
        assert_eq!(ports.exited(PortRole::Left).to_string(), "Port3Out");
    }

    #[test]
    fn rejects_collisions() {
        let err = PortMapping::from_code(121).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::PortCollision {
                first: PortRole::Left,
                second: PortRole::Right,
                ..
            }
        ));
    }

    #[test]
    fn rejects_out_of_range_channels() {
        assert!(matches!(
            PortMapping::from_code(129),
            Err(ConfigurationError::PortOutOfRange {
                role: PortRole::Right,
                channel: 9,
                ..
            })
        ));
        assert!(matches!(
            PortMapping::from_code(102),
            Err(ConfigurationError::PortOutOfRange {
                role: PortRole::Center,
                channel: 0,
                ..
            })
        ));
    }

    #[test]
    fn rejects_wrong_digit_count() {
        assert!(matches!(
            PortMapping::from_code(12),
            Err(ConfigurationError::PortCodeDigits { code: 12 })
        ));
        assert!(matches!(
            PortMapping::from_code(1234),
            Err(ConfigurationError::PortCodeDigits { .. })
        ));
    }
}
