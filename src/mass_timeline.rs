//! Ship mass through a voyage.
//!
//! A timeline starts from a wet mass and a dry mass and applies events in
//! order: burns consume propellant by the rocket equation at the mass the
//! ship has when the burn starts, jettisons and damage remove dry mass, and
//! resupply adds propellant. A burn that needs more propellant than is left
//! empties the tanks and is recorded as a shortfall rather than an error, so
//! an implausible story still gets a full timeline.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PhysicsError, PhysicsResult, ensure_finite, ensure_positive};
use crate::transfer;
use crate::units::{Mass, Time, Velocity, kilogram, kilograms, second, seconds};

/// One mass-changing event, timed from departure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MassEvent {
    #[serde(rename = "time_s")]
    pub time: Time,
    pub label: String,
    pub kind: MassEventKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MassEventKind {
    Burn {
        #[serde(rename = "delta_v_km_s", with = "crate::units::km_s")]
        delta_v: Velocity,
        #[serde(rename = "exhaust_velocity_km_s", with = "crate::units::km_s")]
        exhaust_velocity: Velocity,
        #[serde(rename = "duration_s")]
        duration: Time,
    },
    /// Cargo or structure released on purpose
    Jettison {
        #[serde(rename = "mass_kg")]
        mass: Mass,
    },
    /// Structure lost to damage
    Damage {
        #[serde(rename = "mass_kg")]
        mass: Mass,
    },
    /// Propellant taken on
    Resupply {
        #[serde(rename = "mass_kg")]
        mass: Mass,
    },
}

impl MassEvent {
    pub fn new(time: Time, label: impl Into<String>, kind: MassEventKind) -> Self {
        Self {
            time,
            label: label.into(),
            kind,
        }
    }

    /// Acceleration and deceleration halves of a rest-to-rest brachistochrone.
    pub fn brachistochrone(transit: Time, delta_v: Velocity, exhaust_velocity: Velocity) -> [MassEvent; 2] {
        let half = transit * 0.5;
        let burn = MassEventKind::Burn {
            delta_v: delta_v * 0.5,
            exhaust_velocity,
            duration: half,
        };
        [
            MassEvent::new(seconds(0.0), "acceleration", burn),
            MassEvent::new(half, "deceleration", burn),
        ]
    }
}

/// Ship mass just before or just after an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MassSnapshot {
    pub time_s: f64,
    pub label: String,
    pub total_kg: f64,
    pub dry_kg: f64,
    pub propellant_kg: f64,
}

/// A burn the tanks could not cover.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropellantShortfall {
    pub label: String,
    pub time_s: f64,
    pub required_kg: f64,
    pub missing_kg: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MassTimeline {
    pub initial_mass_kg: f64,
    pub initial_dry_mass_kg: f64,
    /// Initial propellant plus every resupply
    pub propellant_loaded_kg: f64,
    pub propellant_burned_kg: f64,
    pub snapshots: Vec<MassSnapshot>,
    pub shortfalls: Vec<PropellantShortfall>,
}

impl MassTimeline {
    /// State after the last event.
    pub fn final_snapshot(&self) -> Option<&MassSnapshot> {
        self.snapshots.last()
    }

    pub fn total_propellant_consumed(&self) -> Mass {
        kilograms(self.propellant_burned_kg)
    }

    /// Remaining propellant as a fraction of everything loaded.
    pub fn propellant_margin(&self) -> f64 {
        match self.final_snapshot() {
            Some(last) if self.propellant_loaded_kg > 0.0 => last.propellant_kg / self.propellant_loaded_kg,
            _ => 0.0,
        }
    }

    /// Every burn was covered by the propellant on board.
    pub fn is_feasible(&self) -> bool {
        self.shortfalls.is_empty()
    }
}

struct Tanks {
    dry: f64,
    propellant: f64,
}

impl Tanks {
    fn snapshot(&self, time_s: f64, label: &str) -> MassSnapshot {
        MassSnapshot {
            time_s,
            label: label.to_owned(),
            total_kg: self.dry + self.propellant,
            dry_kg: self.dry,
            propellant_kg: self.propellant,
        }
    }

    fn remove_dry(&mut self, mass: Mass, label: &str) -> PhysicsResult<()> {
        let m = ensure_finite("event mass", mass.get::<kilogram>())?;
        if m < 0.0 || m >= self.dry {
            return Err(PhysicsError::invalid(
                "event mass",
                format!("{label}: cannot remove {m} kg from {} kg of dry mass", self.dry),
            ));
        }
        self.dry -= m;
        Ok(())
    }
}

/// Apply `events` in order to a ship of `initial_mass` with `dry_mass` of structure.
///
/// Events must be sorted by start time.
pub fn compute_timeline(initial_mass: Mass, dry_mass: Mass, events: &[MassEvent]) -> PhysicsResult<MassTimeline> {
    let total = ensure_positive("initial mass", initial_mass.get::<kilogram>())?;
    let dry = ensure_positive("dry mass", dry_mass.get::<kilogram>())?;
    if dry > total {
        return Err(PhysicsError::invalid(
            "dry mass",
            format!("{dry} kg exceeds the initial mass of {total} kg"),
        ));
    }
    if let Some(pair) = events.windows(2).find(|pair| pair[1].time < pair[0].time) {
        return Err(PhysicsError::invalid(
            "mass events",
            format!("{} starts before {}", pair[1].label, pair[0].label),
        ));
    }

    let mut tanks = Tanks {
        dry,
        propellant: total - dry,
    };
    let mut loaded = tanks.propellant;
    let mut burned = 0.0;
    let mut shortfalls = Vec::new();
    let mut snapshots = Vec::with_capacity(2 * events.len() + 1);
    snapshots.push(tanks.snapshot(0.0, "initial"));

    for event in events {
        let t = ensure_finite("event time", event.time.get::<second>())?;
        let previous = snapshots.last().map_or(0.0, |s| s.time_s);
        if (t - previous).abs() > 1e-6 {
            snapshots.push(tanks.snapshot(t, &event.label));
        }

        let end = match event.kind {
            MassEventKind::Burn {
                delta_v,
                exhaust_velocity,
                duration,
            } => {
                let duration = ensure_finite("burn duration", duration.get::<second>())?;
                if duration < 0.0 {
                    return Err(PhysicsError::invalid("burn duration", format!("{}: negative", event.label)));
                }
                let required = transfer::propellant_consumed(
                    kilograms(tanks.dry + tanks.propellant),
                    delta_v,
                    exhaust_velocity,
                )?
                .get::<kilogram>();
                let used = required.min(tanks.propellant);
                if required > tanks.propellant {
                    warn!(
                        event = %event.label,
                        required_kg = required,
                        available_kg = tanks.propellant,
                        "burn exceeds remaining propellant"
                    );
                    shortfalls.push(PropellantShortfall {
                        label: event.label.clone(),
                        time_s: t,
                        required_kg: required,
                        missing_kg: required - tanks.propellant,
                    });
                }
                tanks.propellant -= used;
                burned += used;
                t + duration
            }
            MassEventKind::Jettison { mass } | MassEventKind::Damage { mass } => {
                tanks.remove_dry(mass, &event.label)?;
                t
            }
            MassEventKind::Resupply { mass } => {
                let m = ensure_finite("resupply mass", mass.get::<kilogram>())?;
                if m < 0.0 {
                    return Err(PhysicsError::invalid("resupply mass", format!("{}: negative", event.label)));
                }
                tanks.propellant += m;
                loaded += m;
                t
            }
        };
        snapshots.push(tanks.snapshot(end, &event.label));
    }

    Ok(MassTimeline {
        initial_mass_kg: total,
        initial_dry_mass_kg: dry,
        propellant_loaded_kg: loaded,
        propellant_burned_kg: burned,
        snapshots,
        shortfalls,
    })
}
