//! # Handset State Machine
//!
//! A Mealy machine keyed by `(state, key)`. The per-state handler runs
//! first; only when it does not consume the key do the universal
//! transitions apply (Esc steps back, Enter steps forward).
//!
//! The machine draws nothing. Each key yields the body text for the new
//! screen plus any commands to publish.

use tracing::{debug, info};

use super::form::{Field, FormDefaults, HandsetForm};
use super::keys::Key;
use super::state::State;
use crate::msg::protocol::{Direction, Message, RaCommand, RaState, Tracking};

/// Firmware version shown on the version screen
pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Horizontal rule under titles, one display row wide
pub const RULE: &str = "-----------";

/// Result of one keystroke
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// Body text for the screen now showing
    pub display: String,
    /// Messages to publish, in order
    pub commands: Vec<Message>,
}

/// Menu and setup state of the handset
#[derive(Debug, Clone)]
pub struct Handset {
    state: State,
    form: HandsetForm,
    is_setup: bool,
    field_error: bool,
    ra: RaState,
}

impl Default for Handset {
    fn default() -> Self {
        Self::new(&FormDefaults::default())
    }
}

impl Handset {
    pub fn new(defaults: &FormDefaults) -> Self {
        Self {
            state: State::First,
            form: HandsetForm::new(defaults),
            is_setup: false,
            field_error: false,
            ra: RaState::default(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn form(&self) -> &HandsetForm {
        &self.form
    }

    /// Set once elevation entry completes; never cleared
    pub fn is_setup(&self) -> bool {
        self.is_setup
    }

    /// Latest telemetry, shown on the RA screens
    pub fn set_ra_state(&mut self, ra: RaState) {
        self.ra = ra;
    }

    /// Feed one key through the machine
    pub fn handle_key(&mut self, key: Key) -> Output {
        let before = self.state;
        let mut commands = Vec::new();

        let handled = self.handle_in_state(key, &mut commands);
        if !handled && !self.state.is_error() {
            match key {
                Key::Esc => self.state = self.state.prev(),
                Key::Enter => self.state = self.state.next(),
                _ => {}
            }
        }

        if self.state != before {
            self.field_error = false;
            debug!("Handset {:?} -> {:?} on {}", before, self.state, key);
        }

        Output {
            display: self.display_text(),
            commands,
        }
    }

    fn handle_in_state(&mut self, key: Key, commands: &mut Vec<Message>) -> bool {
        match self.state {
            State::First => match key {
                Key::One => self.state = State::ShowVersion,
                Key::Two => self.state = State::UtilityMenu,
                Key::Three => self.state = State::ObjectsMenu,
                _ => return false,
            },

            State::SetRaTracking => {
                let tracking = match key {
                    Key::One => Tracking::On,
                    Key::Two => Tracking::Off,
                    _ => return false,
                };
                commands.push(Message::ra_command(RaCommand::SetTracking, tracking.as_str()));
                self.state = self.state.next();
            }

            State::SetRaDirection => {
                let direction = match key {
                    Key::One => Direction::North,
                    Key::Two => Direction::South,
                    _ => return false,
                };
                commands.push(Message::ra_command(RaCommand::SetDirection, direction.as_str()));
                self.state = State::UtilityMenu;
            }

            State::SetDate => return self.handle_edit(Field::Date, key, Some(State::SetDateError)),
            State::SetTime => return self.handle_edit(Field::Time, key, Some(State::SetTimeError)),
            State::SetLatitude => return self.handle_edit(Field::Latitude, key, None),
            State::SetLongitude => return self.handle_edit(Field::Longitude, key, None),

            State::SetElevation => {
                if key != Key::Enter {
                    return self.form.edit(Field::Elevation, key);
                }
                match self.form.commit(Field::Elevation) {
                    Ok(()) => {
                        self.is_setup = true;
                        self.state = State::First;
                        info!("Handset setup complete");
                    }
                    Err(e) => {
                        debug!("{}", e);
                        self.field_error = true;
                    }
                }
            }

            State::UtilityMenu => match key {
                Key::One => self.state = State::SetRaTracking,
                Key::Esc => self.state = State::First,
                _ => return false,
            },

            // Only Esc leaves an error screen; everything else is swallowed
            State::SetDateError | State::SetTimeError => {
                if key == Key::Esc {
                    self.state = self.state.edit_state();
                }
            }

            State::ShowVersion | State::ObjectsMenu | State::Last => return false,
        }
        true
    }

    fn handle_edit(&mut self, field: Field, key: Key, error_state: Option<State>) -> bool {
        if key != Key::Enter {
            let consumed = self.form.edit(field, key);
            if consumed {
                self.field_error = false;
            }
            return consumed;
        }

        match self.form.commit(field) {
            Ok(()) => self.state = self.state.next(),
            Err(e) => {
                debug!("{}", e);
                match error_state {
                    Some(error) => self.state = error,
                    None => self.field_error = true,
                }
            }
        }
        true
    }

    /// Body text for the current screen (11 columns)
    pub fn display_text(&self) -> String {
        let error = if self.field_error { "\n>>ERROR<<" } else { "" };

        match self.state {
            State::First => {
                let mut text = String::from("1 Setup\n2 Utility\n3 Objects\n\n");
                if !self.is_setup {
                    text.push_str(">Not Setup<");
                }
                text
            }
            State::ShowVersion => format!("VERSION\n{}", VERSION),
            State::SetRaTracking => format!("RA Tracking\n1 - On\n2 - Off\n{}", self.ra.tracking),
            State::SetRaDirection => format!("RA Dir\n1 - North\n2 - South\n{}", self.ra.direction),
            State::SetDate => format!("Set Date\nYYYY-MM-DD\n{}\n{}", RULE, self.form.date),
            State::SetDateError => {
                format!("Set Date\nYYYY-MM-DD\n{}\n{}\n>>ERROR<<", RULE, self.form.date)
            }
            State::SetTime => format!("Set Time\nHH:MM:SS+hh\n{}\n{}", RULE, self.form.time),
            State::SetTimeError => {
                format!("Set Time\nHH:MM:SS+hh\n{}\n{}\n>>ERROR<<", RULE, self.form.time)
            }
            State::SetLatitude => {
                format!("Set\nLatitude\n+DD.dddd\n{}\n{}{}", RULE, self.form.latitude, error)
            }
            State::SetLongitude => {
                format!("Set\nLongitude\n+DD.dddd\n{}\n{}{}", RULE, self.form.longitude, error)
            }
            State::SetElevation => {
                format!("Set\nElevation\n+DDDD\n{}\n{}{}", RULE, self.form.elevation, error)
            }
            State::UtilityMenu => String::from("Utility\nMenu\n\n1 RA Setup"),
            State::ObjectsMenu => String::from("Objects\nMenu"),
            State::Last => String::from(">>END<<"),
        }
    }
}
