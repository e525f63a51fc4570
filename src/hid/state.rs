//! Handset screens.
//!
//! Navigable screens are ordered so that Esc steps back and Enter steps
//! forward. The two error screens sit outside that order and are only
//! reached by explicit transitions.

/// A screen of the handset menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    #[default]
    First,
    ShowVersion,
    SetRaTracking,
    SetRaDirection,
    SetDate,
    SetTime,
    SetLatitude,
    SetLongitude,
    SetElevation,
    UtilityMenu,
    ObjectsMenu,
    Last,
    SetDateError,
    SetTimeError,
}

/// Navigable screens in Esc/Enter order
pub const NAVIGATION_ORDER: [State; 12] = [
    State::First,
    State::ShowVersion,
    State::SetRaTracking,
    State::SetRaDirection,
    State::SetDate,
    State::SetTime,
    State::SetLatitude,
    State::SetLongitude,
    State::SetElevation,
    State::UtilityMenu,
    State::ObjectsMenu,
    State::Last,
];

impl State {
    pub fn is_error(self) -> bool {
        matches!(self, State::SetDateError | State::SetTimeError)
    }

    fn ordinal(self) -> Option<usize> {
        NAVIGATION_ORDER.iter().position(|&s| s == self)
    }

    /// Enter target: the next screen, saturating at `Last`
    pub fn next(self) -> State {
        match self.ordinal() {
            Some(i) => NAVIGATION_ORDER[(i + 1).min(NAVIGATION_ORDER.len() - 1)],
            None => self,
        }
    }

    /// Esc target: the previous screen, saturating at `First`
    pub fn prev(self) -> State {
        match self.ordinal() {
            Some(i) => NAVIGATION_ORDER[i.saturating_sub(1)],
            None => self,
        }
    }

    /// The edit screen an error screen belongs to
    pub fn edit_state(self) -> State {
        match self {
            State::SetDateError => State::SetDate,
            State::SetTimeError => State::SetTime,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_and_prev_saturate() {
        assert_eq!(State::First.prev(), State::First);
        assert_eq!(State::Last.next(), State::Last);
        assert_eq!(State::First.next(), State::ShowVersion);
        assert_eq!(State::SetDate.prev(), State::SetRaDirection);
    }

    #[test]
    fn test_next_then_prev_is_identity_inside_order() {
        for state in &NAVIGATION_ORDER[..NAVIGATION_ORDER.len() - 1] {
            assert_eq!(state.next().prev(), *state);
        }
    }

    #[test]
    fn test_error_states_are_outside_order() {
        for state in [State::SetDateError, State::SetTimeError] {
            assert!(state.is_error());
            assert_eq!(state.next(), state);
            assert_eq!(state.prev(), state);
        }
        assert_eq!(State::SetDateError.edit_state(), State::SetDate);
        assert_eq!(State::SetTimeError.edit_state(), State::SetTime);
        assert!(!State::SetDate.is_error());
    }
}
