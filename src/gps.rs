use serde::Serialize;
use std::fmt;

/// One degree/minute/second triple as stored in the EXIF GPS sub-IFD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
}

impl Dms {
    /// Build from three unsigned rationals (numerator, denominator).
    ///
    /// A zero denominator makes that component zero rather than infinite.
    pub fn from_rationals(deg: (u32, u32), min: (u32, u32), sec: (u32, u32)) -> Self {
        Self {
            degrees: ratio(deg),
            minutes: ratio(min),
            seconds: ratio(sec),
        }
    }

    /// Unsigned decimal degrees: `deg + min/60 + sec/3600`.
    pub fn to_decimal(self) -> f64 {
        self.degrees + self.minutes / 60.0 + self.seconds / 3600.0
    }
}

fn ratio((num, den): (u32, u32)) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// A position in signed decimal degrees (south and west are negative).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinate {
    /// Combine latitude/longitude triples with their `N`/`S` and `E`/`W` references.
    pub fn from_dms(latitude: Dms, latitude_ref: char, longitude: Dms, longitude_ref: char) -> Self {
        Self {
            latitude: signed(latitude.to_decimal(), latitude_ref),
            longitude: signed(longitude.to_decimal(), longitude_ref),
        }
    }

    /// True when both components are inside the valid WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for GpsCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

fn signed(value: f64, reference: char) -> f64 {
    match reference.to_ascii_uppercase() {
        'S' | 'W' => -value,
        _ => value,
    }
}
