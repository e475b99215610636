//! Discrete game clock and calendar arithmetic.
//!
//! The clock counts turns; a round is a fixed number of turns. Everything the
//! simulation schedules is expressed in rounds, resolved from human-readable
//! period strings such as `"15 real minutes"`, `"2 weeks"` or `"sunrise"`.

use std::fmt;
use std::str::FromStr;

use crate::config::TimingConfig;
use crate::world::errors::WorldError;

pub const DAYS_PER_YEAR: u64 = 365;
const MINUTES_PER_DAY: u64 = 24 * 60;

/// A point of the day that recurs once per in-game day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarPhase {
    Noon,
    Midnight,
    Sunrise,
    Sunset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUnit {
    Rounds,
    /// Wall-clock time; value is seconds per unit.
    Real(u64),
    /// In-game time; value is game minutes per unit.
    Game(u64),
    Phase(CalendarPhase),
}

/// A parsed relative period, e.g. `3 weeks` or `15 real minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub quantity: u64,
    pub unit: PeriodUnit,
}

impl Period {
    pub fn parse(text: &str) -> Result<Self, WorldError> {
        let lowered = text.trim().to_lowercase();
        let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(WorldError::InvalidPeriod(text.to_string()));
        }

        let mut quantity = 1;
        if let Ok(n) = tokens[0].parse::<u64>() {
            quantity = n.max(1);
            tokens.remove(0);
        }

        let real = tokens.first() == Some(&"real");
        if real {
            tokens.remove(0);
        }

        let [word] = tokens.as_slice() else {
            return Err(WorldError::InvalidPeriod(text.to_string()));
        };

        let unit = match (*word, real) {
            ("hourly", false) => PeriodUnit::Game(60),
            ("daily", false) => PeriodUnit::Game(MINUTES_PER_DAY),
            ("weekly", false) => PeriodUnit::Game(7 * MINUTES_PER_DAY),
            ("monthly", false) => PeriodUnit::Game(30 * MINUTES_PER_DAY),
            ("yearly", false) => PeriodUnit::Game(DAYS_PER_YEAR * MINUTES_PER_DAY),
            (w, real) => {
                let singular = w.strip_suffix('s').unwrap_or(w);
                match (singular, real) {
                    ("round", false) => PeriodUnit::Rounds,
                    ("second", true) => PeriodUnit::Real(1),
                    ("minute", true) => PeriodUnit::Real(60),
                    ("hour", true) => PeriodUnit::Real(3600),
                    ("day", true) => PeriodUnit::Real(86_400),
                    ("week", true) => PeriodUnit::Real(7 * 86_400),
                    ("minute", false) => PeriodUnit::Game(1),
                    ("hour", false) => PeriodUnit::Game(60),
                    ("day", false) => PeriodUnit::Game(MINUTES_PER_DAY),
                    ("week", false) => PeriodUnit::Game(7 * MINUTES_PER_DAY),
                    ("month", false) => PeriodUnit::Game(30 * MINUTES_PER_DAY),
                    ("year", false) => PeriodUnit::Game(DAYS_PER_YEAR * MINUTES_PER_DAY),
                    ("noon", false) => PeriodUnit::Phase(CalendarPhase::Noon),
                    ("midnight", false) => PeriodUnit::Phase(CalendarPhase::Midnight),
                    ("sunrise", false) => PeriodUnit::Phase(CalendarPhase::Sunrise),
                    ("sunset", false) => PeriodUnit::Phase(CalendarPhase::Sunset),
                    _ => return Err(WorldError::InvalidPeriod(text.to_string())),
                }
            }
        };

        Ok(Period { quantity, unit })
    }

    /// True when the period names a time of day rather than a duration.
    pub fn is_calendar_phase(&self) -> bool {
        matches!(self.unit, PeriodUnit::Phase(_))
    }
}

impl FromStr for Period {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::parse(s)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            PeriodUnit::Rounds => write!(f, "{} rounds", self.quantity),
            PeriodUnit::Real(secs) => write!(f, "{} real seconds", self.quantity.saturating_mul(secs)),
            PeriodUnit::Game(mins) => write!(f, "{} game minutes", self.quantity.saturating_mul(mins)),
            PeriodUnit::Phase(phase) => write!(f, "{} x {:?}", self.quantity, phase),
        }
    }
}

/// Calendar view of a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameDate {
    pub round_number: u64,
    pub rounds_per_day: u64,
    pub round_seconds: u64,
    pub night_hours: u32,
    /// Zero-based year.
    pub year: u64,
    /// One-based day since the world began.
    pub day: u64,
    pub hour: u32,
    pub minute: u32,
    pub night: bool,
}

impl GameDate {
    fn new(round: u64, rounds_per_day: u64, round_seconds: u64, night_hours: u32) -> Self {
        let day_index = round / rounds_per_day;
        let round_of_day = round % rounds_per_day;
        let minutes_of_day = round_of_day * MINUTES_PER_DAY / rounds_per_day;
        let hour = (minutes_of_day / 60) as u32;
        let minute = (minutes_of_day % 60) as u32;

        let mut date = GameDate {
            round_number: round,
            rounds_per_day,
            round_seconds,
            night_hours,
            year: day_index / DAYS_PER_YEAR,
            day: day_index + 1,
            hour,
            minute,
            night: false,
        };
        date.night = hour < date.sunrise_hour() || hour >= date.sunset_hour();
        date
    }

    pub fn sunrise_hour(&self) -> u32 {
        self.night_hours / 2
    }

    pub fn sunset_hour(&self) -> u32 {
        24 - (self.night_hours - self.night_hours / 2)
    }

    pub fn day_of_year(&self) -> u64 {
        (self.day - 1) % DAYS_PER_YEAR + 1
    }

    fn phase_hour(&self, phase: CalendarPhase) -> u32 {
        match phase {
            CalendarPhase::Noon => 12,
            CalendarPhase::Midnight => 0,
            CalendarPhase::Sunrise => self.sunrise_hour(),
            CalendarPhase::Sunset => self.sunset_hour(),
        }
    }

    /// Round offset within a day at which `hour` begins.
    fn hour_offset(&self, hour: u32) -> u64 {
        div_ceil(hour as u64 * self.rounds_per_day, 24) % self.rounds_per_day
    }

    /// Resolve `period` against this date. Always lands at least one round later.
    pub fn add_period(&self, period: &Period) -> u64 {
        let round = self.round_number;
        let rpd = self.rounds_per_day;
        let delta = match period.unit {
            PeriodUnit::Rounds => period.quantity,
            PeriodUnit::Real(secs) => {
                div_ceil(period.quantity.saturating_mul(secs), self.round_seconds)
            }
            PeriodUnit::Game(minutes) => div_ceil(
                period.quantity.saturating_mul(minutes).saturating_mul(rpd),
                MINUTES_PER_DAY,
            ),
            PeriodUnit::Phase(phase) => {
                let day_start = round - round % rpd;
                let mut next = day_start.saturating_add(self.hour_offset(self.phase_hour(phase)));
                if next <= round {
                    next = next.saturating_add(rpd);
                }
                return next.saturating_add((period.quantity - 1).saturating_mul(rpd));
            }
        };
        round.saturating_add(delta.max(1))
    }
}

impl fmt::Display for GameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "year {} day {} {:02}:{:02}{}",
            self.year,
            self.day_of_year(),
            self.hour,
            self.minute,
            if self.night { " (night)" } else { "" }
        )
    }
}

fn div_ceil(a: u64, b: u64) -> u64 {
    if b == 0 {
        return a;
    }
    a / b + u64::from(a % b != 0)
}

/// Monotonic turn counter with round and calendar views.
#[derive(Debug, Clone)]
pub struct GameClock {
    turn: u64,
    turn_ms: u64,
    turns_per_round: u64,
    round_seconds: u64,
    rounds_per_day: u64,
    night_hours: u32,
    visitor_tracking_seconds: u64,
}

impl GameClock {
    pub fn new(timing: &TimingConfig) -> Self {
        let turn_ms = timing.turn_ms.max(1);
        let round_seconds = timing.round_seconds.max(1);
        Self {
            turn: 0,
            turn_ms,
            turns_per_round: (round_seconds * 1000 / turn_ms).max(1),
            round_seconds,
            rounds_per_day: timing.rounds_per_day.max(24),
            night_hours: timing.night_hours.min(24),
            visitor_tracking_seconds: timing.visitor_tracking_seconds,
        }
    }

    pub fn round_count(&self) -> u64 {
        self.turn / self.turns_per_round
    }

    pub fn turn_count(&self) -> u64 {
        self.turn
    }

    pub fn turns_per_round(&self) -> u64 {
        self.turns_per_round
    }

    pub fn turns_per_second(&self) -> u64 {
        (1000 / self.turn_ms).max(1)
    }

    pub fn rounds_per_day(&self) -> u64 {
        self.rounds_per_day
    }

    /// Advance one turn. Returns true when the turn starts a new round.
    pub fn advance_turn(&mut self) -> bool {
        self.turn = self.turn.saturating_add(1);
        self.turn % self.turns_per_round == 0
    }

    pub fn advance_rounds(&mut self, rounds: u64) {
        self.turn = self
            .turn
            .saturating_add(rounds.saturating_mul(self.turns_per_round));
    }

    /// Jump to the first turn of `round`.
    pub fn set_round(&mut self, round: u64) {
        self.turn = round.saturating_mul(self.turns_per_round);
    }

    pub fn seconds_to_rounds(&self, seconds: u64) -> u64 {
        div_ceil(seconds, self.round_seconds)
    }

    pub fn seconds_to_turns(&self, seconds: u64) -> u64 {
        div_ceil(seconds.saturating_mul(1000), self.turn_ms)
    }

    /// Turns a visitor ledger entry stays fresh.
    pub fn visitor_window_turns(&self) -> u64 {
        self.seconds_to_turns(self.visitor_tracking_seconds)
    }

    pub fn date(&self, round: u64) -> GameDate {
        GameDate::new(
            round,
            self.rounds_per_day,
            self.round_seconds,
            self.night_hours,
        )
    }

    pub fn now(&self) -> GameDate {
        self.date(self.round_count())
    }

    /// Round at which `period` has elapsed since `anchor`.
    pub fn add_period(&self, anchor: u64, period: &str) -> Result<u64, WorldError> {
        let period = Period::parse(period)?;
        Ok(self.date(anchor).add_period(&period))
    }
}
