//! Conversion of decimal-degree locations into the degrees/minutes/seconds form used by EXIF GPS tags.

use crate::features::error::GeoError;
use serde::{Deserialize, Serialize};

/// Number of decimal places kept for the seconds component by default.
pub const DEFAULT_SECONDS_DECIMALS: u32 = 3;

/// A location in signed decimal degrees with a signed altitude in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct LatLonAlt {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// A location as signed whole degrees, unsigned minutes and seconds, and a signed altitude.
///
/// A degree component of zero carries no sign, so the hemisphere of a location within one
/// degree of the equator or meridian must be taken from the decimal source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct LatLonDmsAlt {
    pub lat_deg: f64,
    pub lat_min: f64,
    pub lat_sec: f64,
    pub lon_deg: f64,
    pub lon_min: f64,
    pub lon_sec: f64,
    pub alt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LatitudeRef {
    North,
    South,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LongitudeRef {
    East,
    West,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AltitudeRef {
    AboveSeaLevel,
    BelowSeaLevel,
}

impl LatitudeRef {
    /// EXIF `GPSLatitudeRef` value.
    pub const fn as_exif(self) -> &'static str {
        match self {
            Self::North => "N",
            Self::South => "S",
        }
    }
}

impl LongitudeRef {
    /// EXIF `GPSLongitudeRef` value.
    pub const fn as_exif(self) -> &'static str {
        match self {
            Self::East => "E",
            Self::West => "W",
        }
    }
}

impl AltitudeRef {
    /// EXIF `GPSAltitudeRef` value.
    pub const fn as_exif(self) -> u8 {
        match self {
            Self::AboveSeaLevel => 0,
            Self::BelowSeaLevel => 1,
        }
    }
}

impl LatLonAlt {
    /// The "no location recorded" value. Never emitted as GPS tags.
    pub const NULL: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    pub fn latitude_ref(&self) -> LatitudeRef {
        if self.latitude < 0.0 {
            LatitudeRef::South
        } else {
            LatitudeRef::North
        }
    }

    pub fn longitude_ref(&self) -> LongitudeRef {
        if self.longitude < 0.0 {
            LongitudeRef::West
        } else {
            LongitudeRef::East
        }
    }

    pub fn altitude_ref(&self) -> AltitudeRef {
        if self.altitude < 0.0 {
            AltitudeRef::BelowSeaLevel
        } else {
            AltitudeRef::AboveSeaLevel
        }
    }

    /// Converts to degrees/minutes/seconds, rounding seconds to `seconds_decimals` places.
    ///
    /// The sign of the input is re-applied to the degree component only.
    ///
    /// # Errors
    ///
    /// * [`GeoError::LatitudeOutOfRange`] / [`GeoError::LongitudeOutOfRange`] when a coordinate is
    ///   outside `[-90, 90]` / `[-180, 180]` (or is NaN).
    /// * [`GeoError::SignMismatch`] when a non-zero degree component ends up with the opposite sign
    ///   of its non-zero source.
    pub fn to_dms(&self, seconds_decimals: u32) -> Result<LatLonDmsAlt, GeoError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(GeoError::LatitudeOutOfRange(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(GeoError::LongitudeOutOfRange(self.longitude));
        }

        let (lat_deg, lat_min, lat_sec) = decimal_to_dms(self.latitude, seconds_decimals);
        let (lon_deg, lon_min, lon_sec) = decimal_to_dms(self.longitude, seconds_decimals);

        check_sign("latitude", self.latitude, lat_deg)?;
        check_sign("longitude", self.longitude, lon_deg)?;

        Ok(LatLonDmsAlt {
            lat_deg,
            lat_min,
            lat_sec,
            lon_deg,
            lon_min,
            lon_sec,
            alt: self.altitude,
        })
    }
}

fn decimal_to_dms(decimal: f64, seconds_decimals: u32) -> (f64, f64, f64) {
    let scale = 10f64.powi(i32::try_from(seconds_decimals).unwrap_or(i32::MAX));

    let t = decimal.abs();
    let mut deg = t.floor();
    let t = (t - deg) * 60.0;
    let mut min = t.floor();
    let mut sec = ((t - min) * 60.0 * scale).round() / scale;

    // Rounding can push seconds (and then minutes) up to a full unit.
    if sec >= 60.0 {
        sec -= 60.0;
        min += 1.0;
    }
    if min >= 60.0 {
        min -= 60.0;
        deg += 1.0;
    }

    // Zero degrees stays unsigned; -0.0 would otherwise leak through copysign.
    let deg = if deg == 0.0 { 0.0 } else { deg.copysign(decimal) };
    (deg, min, sec)
}

fn check_sign(axis: &'static str, decimal: f64, degrees: f64) -> Result<(), GeoError> {
    if decimal != 0.0 && degrees != 0.0 && decimal.signum() != degrees.signum() {
        return Err(GeoError::SignMismatch {
            axis,
            decimal,
            degrees,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_dms_eq(actual: LatLonDmsAlt, expected: LatLonDmsAlt) {
        let pairs = [
            (actual.lat_deg, expected.lat_deg, "lat_deg"),
            (actual.lat_min, expected.lat_min, "lat_min"),
            (actual.lat_sec, expected.lat_sec, "lat_sec"),
            (actual.lon_deg, expected.lon_deg, "lon_deg"),
            (actual.lon_min, expected.lon_min, "lon_min"),
            (actual.lon_sec, expected.lon_sec, "lon_sec"),
            (actual.alt, expected.alt, "alt"),
        ];
        for (a, e, name) in pairs {
            assert!((a - e).abs() < 1e-9, "{name}: expected {e}, got {a}");
        }
    }

    fn dms(values: [f64; 7]) -> LatLonDmsAlt {
        LatLonDmsAlt {
            lat_deg: values[0],
            lat_min: values[1],
            lat_sec: values[2],
            lon_deg: values[3],
            lon_min: values[4],
            lon_sec: values[5],
            alt: values[6],
        }
    }

    #[test]
    fn test_all_four_quadrants() -> Result<(), GeoError> {
        // Manchester: north of the equator, west of the meridian
        let result = LatLonAlt::new(53.47830, -2.24958, 50.0).to_dms(3)?;
        assert_dms_eq(result, dms([53.0, 28.0, 41.880, -2.0, 14.0, 58.488, 50.0]));

        // Modena: north, east
        let result = LatLonAlt::new(44.64632, 10.92550, 60.0).to_dms(3)?;
        assert_dms_eq(result, dms([44.0, 38.0, 46.752, 10.0, 55.0, 31.8, 60.0]));

        // Napier: south, east
        let result = LatLonAlt::new(-39.4790, 176.9173, 70.0).to_dms(3)?;
        assert_dms_eq(result, dms([-39.0, 28.0, 44.4, 176.0, 55.0, 2.28, 70.0]));

        // Santiago: south, west
        let result = LatLonAlt::new(-33.43697, -70.63445, 80.0).to_dms(3)?;
        assert_dms_eq(result, dms([-33.0, 26.0, 13.092, -70.0, 38.0, 4.02, 80.0]));

        Ok(())
    }

    #[test]
    fn test_null_location_converts_to_zero() -> Result<(), GeoError> {
        let result = LatLonAlt::NULL.to_dms(DEFAULT_SECONDS_DECIMALS)?;
        assert_eq!(result, LatLonDmsAlt::default());
        Ok(())
    }

    #[test]
    fn test_small_negative_latitude_keeps_southern_hemisphere() -> Result<(), GeoError> {
        let location = LatLonAlt::new(-0.880395, 91.684533, 50.0);
        let result = location.to_dms(3)?;
        assert_dms_eq(result, dms([0.0, 52.0, 49.422, 91.0, 41.0, 4.319, 50.0]));

        // Degree component is an unsigned zero, not -0.0.
        assert!(result.lat_deg.is_sign_positive(), "lat_deg should be +0.0");
        assert_eq!(location.latitude_ref(), LatitudeRef::South);
        assert_eq!(location.latitude_ref().as_exif(), "S");
        Ok(())
    }

    #[test]
    fn test_small_negative_longitude_keeps_western_hemisphere() -> Result<(), GeoError> {
        let location = LatLonAlt::new(87.469077, -0.849447, 50.0);
        let result = location.to_dms(3)?;
        assert_dms_eq(result, dms([87.0, 28.0, 8.677, 0.0, 50.0, 58.009, 50.0]));
        assert!(result.lon_deg.is_sign_positive());
        assert_eq!(location.longitude_ref(), LongitudeRef::West);
        Ok(())
    }

    #[test]
    fn test_out_of_range_coordinates_are_rejected() {
        assert_eq!(
            LatLonAlt::new(90.5, 0.0, 0.0).to_dms(3),
            Err(GeoError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            LatLonAlt::new(0.0, -180.01, 0.0).to_dms(3),
            Err(GeoError::LongitudeOutOfRange(-180.01))
        );
        assert!(LatLonAlt::new(f64::NAN, 0.0, 0.0).to_dms(3).is_err());
    }

    #[test]
    fn test_boundaries_are_accepted() -> Result<(), GeoError> {
        let result = LatLonAlt::new(-90.0, 180.0, 0.0).to_dms(3)?;
        assert_eq!(result.lat_deg, -90.0);
        assert_eq!(result.lon_deg, 180.0);
        Ok(())
    }

    #[test]
    fn test_seconds_rounding_carries_into_minutes() -> Result<(), GeoError> {
        // 10.9999999 degrees is 10 deg 59 min 59.99964 sec, which rounds to a full minute.
        let result = LatLonAlt::new(10.9999999, 0.0, 0.0).to_dms(2)?;
        assert_eq!(result.lat_deg, 11.0);
        assert_eq!(result.lat_min, 0.0);
        assert!(result.lat_sec.abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_altitude_reference() {
        assert_eq!(
            LatLonAlt::new(1.0, 1.0, -3.5).altitude_ref(),
            AltitudeRef::BelowSeaLevel
        );
        assert_eq!(LatLonAlt::new(1.0, 1.0, 0.0).altitude_ref().as_exif(), 0);
    }

    #[test]
    fn test_negative_zero_is_the_null_location() {
        assert!(LatLonAlt::new(-0.0, 0.0, 0.0).is_null());
        assert!(!LatLonAlt::new(0.0, 0.0, 1.0).is_null());
    }
}
