//! Mean orbital elements for the eight planets (J2000 ecliptic and equinox).
//! Source: Standish, "Keplerian Elements for Approximate Positions of the
//! Major Planets" (JPL), table 1, valid 1800 AD – 2050 AD.

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::types::{AU_KM, mu};
use crate::units::{GravParam, Length, km};

/// Identifier for the planets the ephemeris covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Planet {
    Mercury,
    Venus,
    Earth,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
}

impl Planet {
    /// All planets, ordered outward from the Sun
    pub const ALL: [Planet; 8] = [
        Planet::Mercury,
        Planet::Venus,
        Planet::Earth,
        Planet::Mars,
        Planet::Jupiter,
        Planet::Saturn,
        Planet::Uranus,
        Planet::Neptune,
    ];

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Planet::Mercury => "Mercury",
            Planet::Venus => "Venus",
            Planet::Earth => "Earth",
            Planet::Mars => "Mars",
            Planet::Jupiter => "Jupiter",
            Planet::Saturn => "Saturn",
            Planet::Uranus => "Uranus",
            Planet::Neptune => "Neptune",
        }
    }

    /// Gravitational parameter of the planet itself.
    pub fn mu(&self) -> GravParam {
        match self {
            Planet::Mercury => mu::MERCURY,
            Planet::Venus => mu::VENUS,
            Planet::Earth => mu::EARTH,
            Planet::Mars => mu::MARS,
            Planet::Jupiter => mu::JUPITER,
            Planet::Saturn => mu::SATURN,
            Planet::Uranus => mu::URANUS,
            Planet::Neptune => mu::NEPTUNE,
        }
    }

    /// Mean heliocentric distance used for circular-orbit estimates
    /// (synodic periods, Hohmann transfers).
    pub fn mean_distance(&self) -> Length {
        km(match self {
            Planet::Mercury => 57_909_050.0,
            Planet::Venus => 108_208_000.0,
            Planet::Earth => AU_KM,
            Planet::Mars => 227_939_200.0,
            Planet::Jupiter => 778_570_000.0,
            Planet::Saturn => 1_433_530_000.0,
            Planet::Uranus => 2_872_460_000.0,
            Planet::Neptune => 4_495_060_000.0,
        })
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Planet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A quantity with a value at J2000 and a linear rate per Julian century.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Secular {
    pub at_j2000: f64,
    pub per_century: f64,
}

impl Secular {
    const fn new(at_j2000: f64, per_century: f64) -> Self {
        Self { at_j2000, per_century }
    }

    /// Value after `centuries` Julian centuries from J2000.
    #[inline]
    pub fn at(&self, centuries: f64) -> f64 {
        self.at_j2000 + self.per_century * centuries
    }
}

/// Mean elements of one planet, in the units of the published table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeanElements {
    pub planet: Planet,
    /// Semi-major axis (AU)
    pub semi_major_axis_au: Secular,
    pub eccentricity: Secular,
    /// Inclination (deg)
    pub inclination_deg: Secular,
    /// Mean longitude L (deg)
    pub mean_longitude_deg: Secular,
    /// Longitude of perihelion ϖ (deg)
    pub longitude_of_perihelion_deg: Secular,
    /// Longitude of the ascending node Ω (deg)
    pub ascending_node_deg: Secular,
}

#[rustfmt::skip]
static MEAN_ELEMENTS: LazyLock<[MeanElements; 8]> = LazyLock::new(|| {
    let row = |planet, a: [f64; 2], e: [f64; 2], i: [f64; 2], l: [f64; 2], w: [f64; 2], o: [f64; 2]| MeanElements {
        planet,
        semi_major_axis_au: Secular::new(a[0], a[1]),
        eccentricity: Secular::new(e[0], e[1]),
        inclination_deg: Secular::new(i[0], i[1]),
        mean_longitude_deg: Secular::new(l[0], l[1]),
        longitude_of_perihelion_deg: Secular::new(w[0], w[1]),
        ascending_node_deg: Secular::new(o[0], o[1]),
    };
    [
        row(Planet::Mercury, [0.38709831, 0.0], [0.20563069, 0.00002004], [7.00486, -0.00593],
            [252.25084, 149472.67411], [77.45645, 0.15929], [48.33067, -0.12534]),
        row(Planet::Venus, [0.72332956, 0.0], [0.00677323, -0.00004764], [3.39471, -0.00867],
            [181.97973, 58517.81539], [131.56370, 0.00268], [76.67992, -0.27801]),
        // Earth-Moon barycenter
        row(Planet::Earth, [1.00000261, 0.00000562], [0.01670857, -0.00004204], [-0.00015, -0.01337],
            [100.46457, 35999.37244], [102.93735, 0.32329], [0.0, 0.0]),
        row(Planet::Mars, [1.52366231, -0.00007328], [0.09341233, 0.00009048], [1.85026, -0.00675],
            [-4.55343, 19140.29934], [-23.94362, 0.44541], [49.55809, -0.29108]),
        row(Planet::Jupiter, [5.20260391, 0.00001663], [0.04849764, 0.00016341], [1.30330, -0.00198],
            [34.39644, 3034.90567], [14.72847, 0.21536], [100.46444, 0.17656]),
        row(Planet::Saturn, [9.55490916, -0.00021389], [0.05550862, -0.00034661], [2.48868, 0.00774],
            [49.95424, 1222.11371], [92.59887, -0.41897], [113.66524, -0.25060]),
        row(Planet::Uranus, [19.21844610, -0.00020257], [0.04629511, -0.00003026], [0.77320, 0.00074],
            [313.23818, 428.48103], [170.95427, 0.40317], [74.01692, 0.04240]),
        row(Planet::Neptune, [30.11038688, 0.00006947], [0.00898922, 0.00000606], [1.76917, -0.00542],
            [-55.12002, 218.45652], [44.96476, -0.32636], [131.78406, -0.00651]),
    ]
});

/// Mean elements for a planet from the shared table.
pub fn mean_elements(planet: Planet) -> &'static MeanElements {
    &MEAN_ELEMENTS[planet.index()]
}

/// Force initialization of the element table.
pub fn warm_up() {
    LazyLock::force(&MEAN_ELEMENTS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::kilometer;

    #[test]
    fn test_table_is_indexed_by_planet() {
        for planet in Planet::ALL {
            assert_eq!(mean_elements(planet).planet, planet);
        }
    }

    #[test]
    fn test_mean_distance_close_to_table_axis() {
        for planet in Planet::ALL {
            let table_km = mean_elements(planet).semi_major_axis_au.at_j2000 * AU_KM;
            let mean_km = planet.mean_distance().get::<kilometer>();
            assert!(
                (table_km - mean_km).abs() / mean_km < 5e-3,
                "{planet}: table {table_km} km vs mean {mean_km} km"
            );
        }
    }

    #[test]
    fn test_secular_rate() {
        let s = Secular::new(1.0, 0.5);
        assert_eq!(s.at(0.0), 1.0);
        assert_eq!(s.at(2.0), 2.0);
    }

    #[test]
    fn test_planet_serde_names() {
        let json = serde_json::to_string(&Planet::Jupiter).unwrap();
        assert_eq!(json, "\"jupiter\"");
        let back: Planet = serde_json::from_str("\"mars\"").unwrap();
        assert_eq!(back, Planet::Mars);
    }
}
