use crate::sys::location::Fix;
use crate::wheel::{Category, FULL_TURN};
use strum::Display as StrumDisplay;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Idle,
    Spinning,
    Searching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Busy {
    #[error("the wheel is already {0}")]
    InProgress(Phase),
    #[error("cannot move to the idle phase from idle")]
    AlreadyIdle,
}

/// Where a spin came to rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Landing {
    pub rotation: f64,
    pub category: Category,
}

/// Mutable coordinator state. Owned by the event loop and never shared.
#[derive(Debug, Clone)]
pub struct Session {
    phase: Phase,
    pub rotation: f64,
    pub fix: Fix,
    pub place: String,
    pub last_category: Option<Category>,
    locate_generation: u64,
}

impl Session {
    pub fn new(fix: Fix, place: impl Into<String>) -> Self {
        Self {
            phase: Phase::Idle,
            rotation: 0.0,
            fix,
            place: place.into(),
            last_category: None,
            locate_generation: 0,
        }
    }

    pub fn locate_generation(&self) -> u64 {
        self.locate_generation
    }

    /// Starts a new locate run; fixes and names from earlier runs are ignored from now on.
    pub fn relocate(&mut self) -> u64 {
        self.locate_generation += 1;
        self.locate_generation
    }

    pub fn set_fix(&mut self, generation: u64, fix: Fix) -> bool {
        if generation != self.locate_generation {
            return false;
        }
        self.fix = fix;
        true
    }

    pub fn set_place(&mut self, generation: u64, name: String) -> bool {
        if generation != self.locate_generation {
            return false;
        }
        self.place = name;
        true
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Single-flight guard: only an idle session may start work.
    pub fn begin(&mut self, next: Phase) -> Result<(), Busy> {
        match (self.phase, next) {
            (_, Phase::Idle) => Err(Busy::AlreadyIdle),
            (Phase::Idle, next) => {
                self.phase = next;
                Ok(())
            }
            (current, _) => Err(Busy::InProgress(current)),
        }
    }

    /// The wheel stopped; its search is now running.
    pub fn land(&mut self, landing: Landing) {
        if self.phase != Phase::Spinning {
            log::warn!("Landing received while {}", self.phase);
        }
        self.phase = Phase::Searching;
        self.rotation = landing.rotation.rem_euclid(FULL_TURN);
        self.last_category = Some(landing.category);
    }

    pub fn finish(&mut self) {
        if self.phase == Phase::Idle {
            log::warn!("Search finished while idle");
        }
        self.phase = Phase::Idle;
    }
}
