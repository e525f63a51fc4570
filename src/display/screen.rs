//! A two-part screen: status bar above, body below.

use super::render::Renderer;
use super::Display;
use crate::error::Result;
use crate::hid::machine::RULE;
use crate::msg::protocol::{Direction, RaState, Tracking};

/// Status bar for the handset: `<T><D> <position>` plus a rule
///
/// T is `1` when tracking, `0` otherwise; D is `N` or `S`.
///
/// On the 11-column handset a position of 10^8 or more does not fit; the
/// grid clips the trailing digits.
pub fn status_line(ra: &RaState) -> String {
    let tracking = match ra.tracking {
        Tracking::On => '1',
        Tracking::Off => '0',
    };
    let direction = match ra.direction {
        Direction::North => 'N',
        Direction::South => 'S',
    };
    format!("{}{} {}\n{}", tracking, direction, ra.position, RULE)
}

#[derive(Debug)]
pub struct Screen<D> {
    renderer: Renderer<D>,
    status: String,
    body: String,
}

impl<D: Display> Screen<D> {
    pub fn new(renderer: Renderer<D>) -> Self {
        Self {
            renderer,
            status: String::new(),
            body: String::new(),
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    pub fn text(&self) -> String {
        format!("{}\n{}", self.status, self.body)
    }

    /// Push the current status and body to the display
    pub fn refresh(&mut self) -> Result<usize> {
        let text = self.text();
        self.renderer.render(&text)
    }

    pub fn renderer(&self) -> &Renderer<D> {
        &self.renderer
    }
}
