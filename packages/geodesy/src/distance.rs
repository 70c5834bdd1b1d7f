//! Great-circle distances with mode-specific adjustments.

use footprint_factor_models::{Location, TransportMode};
use geo::Point;

use crate::GeodesyError;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Fixed allowance added to every flight for taxiing, holding and approach
/// paths, in kilometres.
pub const FLIGHT_DETOUR_KM: f64 = 95.0;

/// Rail networks do not follow great circles; train distances are scaled
/// by this factor.
pub const TRAIN_ROUTING_FACTOR: f64 = 1.2;

/// Validates a coordinate pair and returns it as a `(lng, lat)` point.
///
/// # Errors
///
/// Returns [`GeodesyError::InvalidCoordinate`] if either value is out of
/// range or not a number.
pub fn checked_point(latitude: f64, longitude: f64) -> Result<Point<f64>, GeodesyError> {
    if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
        Ok(Point::new(longitude, latitude))
    } else {
        Err(GeodesyError::InvalidCoordinate {
            latitude,
            longitude,
        })
    }
}

/// Converts a location to a validated point.
///
/// # Errors
///
/// Returns [`GeodesyError::InvalidCoordinate`] if the stored coordinates
/// are out of range.
pub fn location_point(location: &Location) -> Result<Point<f64>, GeodesyError> {
    checked_point(location.latitude, location.longitude)
}

/// Haversine distance between two validated points, in kilometres.
fn great_circle_km(a: Point<f64>, b: Point<f64>) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.x() - a.x()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1 for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Great-circle distance between two coordinates, in kilometres.
///
/// # Errors
///
/// Returns [`GeodesyError::InvalidCoordinate`] if any latitude is outside
/// `[-90, 90]` or any longitude is outside `[-180, 180]`.
pub fn haversine_distance(
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
) -> Result<f64, GeodesyError> {
    let a = checked_point(lat1, lon1)?;
    let b = checked_point(lat2, lon2)?;
    Ok(great_circle_km(a, b))
}

/// Flight distance: great-circle distance plus [`FLIGHT_DETOUR_KM`].
///
/// Never less than the detour allowance, even for identical endpoints.
///
/// # Errors
///
/// Returns [`GeodesyError::InvalidCoordinate`] if either location has
/// out-of-range coordinates.
pub fn flight_distance(origin: &Location, destination: &Location) -> Result<f64, GeodesyError> {
    let a = location_point(origin)?;
    let b = location_point(destination)?;
    Ok(great_circle_km(a, b) + FLIGHT_DETOUR_KM)
}

/// Train distance: great-circle distance times [`TRAIN_ROUTING_FACTOR`],
/// rounded to whole kilometres.
///
/// # Errors
///
/// Returns [`GeodesyError::InvalidCoordinate`] if either location has
/// out-of-range coordinates.
pub fn train_distance(origin: &Location, destination: &Location) -> Result<f64, GeodesyError> {
    let a = location_point(origin)?;
    let b = location_point(destination)?;
    Ok((great_circle_km(a, b) * TRAIN_ROUTING_FACTOR).round())
}

/// Distance for a trip in the given mode.
///
/// # Errors
///
/// Returns [`GeodesyError::InvalidCoordinate`] if either location has
/// out-of-range coordinates.
pub fn travel_distance(
    mode: TransportMode,
    origin: &Location,
    destination: &Location,
) -> Result<f64, GeodesyError> {
    match mode {
        TransportMode::Plane => flight_distance(origin, destination),
        TransportMode::Train => train_distance(origin, destination),
    }
}

#[cfg(test)]
mod tests {
    use geo::{Distance, Haversine};

    use super::*;

    const SAMPLE_PAIRS: &[((f64, f64), (f64, f64))] = &[
        ((47.3779, 8.5403), (46.2102, 6.1423)),
        ((47.4647, 8.5492), (40.6413, -73.7781)),
        ((51.4700, -0.4543), (-33.9399, 151.1753)),
        ((0.0, 0.0), (0.0, 180.0)),
        ((90.0, 0.0), (-90.0, 0.0)),
        ((-12.5, -179.9), (15.25, 179.9)),
    ];

    fn location(mode: TransportMode, latitude: f64, longitude: f64) -> Location {
        Location {
            id: 0,
            transport_mode: mode,
            name: "test".to_string(),
            latitude,
            longitude,
            iata_code: None,
            country_code: None,
        }
    }

    #[test]
    fn distance_is_symmetric() {
        for &((lat1, lon1), (lat2, lon2)) in SAMPLE_PAIRS {
            let ab = haversine_distance(lat1, lon1, lat2, lon2).unwrap();
            let ba = haversine_distance(lat2, lon2, lat1, lon1).unwrap();
            assert!((ab - ba).abs() < 1e-9, "{ab} != {ba}");
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        for &((lat, lon), _) in SAMPLE_PAIRS {
            assert!(haversine_distance(lat, lon, lat, lon).unwrap().abs() < f64::EPSILON);
        }
    }

    #[test]
    fn antipodal_distance_is_half_circumference() {
        let d = haversine_distance(0.0, 0.0, 0.0, 180.0).unwrap();
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn agrees_with_geo_haversine_within_radius_difference() {
        // geo uses a 6371.0088 km mean radius; ours is 6371 km.
        for &((lat1, lon1), (lat2, lon2)) in SAMPLE_PAIRS {
            let ours = haversine_distance(lat1, lon1, lat2, lon2).unwrap();
            let theirs =
                Haversine.distance(Point::new(lon1, lat1), Point::new(lon2, lat2)) / 1000.0;
            assert!(
                (ours - theirs).abs() <= theirs * 1e-5 + 1e-6,
                "ours={ours} geo={theirs}"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(matches!(
            haversine_distance(90.1, 0.0, 0.0, 0.0),
            Err(GeodesyError::InvalidCoordinate { .. })
        ));
        assert!(haversine_distance(0.0, 0.0, -90.5, 0.0).is_err());
        assert!(haversine_distance(0.0, 180.5, 0.0, 0.0).is_err());
        assert!(haversine_distance(0.0, 0.0, 0.0, -181.0).is_err());
        assert!(haversine_distance(f64::NAN, 0.0, 0.0, 0.0).is_err());
        assert!(haversine_distance(90.0, 180.0, -90.0, -180.0).is_ok());
    }

    #[test]
    fn flight_distance_floor_is_detour() {
        let zrh = location(TransportMode::Plane, 47.4647, 8.5492);
        assert!((flight_distance(&zrh, &zrh).unwrap() - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn flight_distance_adds_detour() {
        let zrh = location(TransportMode::Plane, 47.4647, 8.5492);
        let gva = location(TransportMode::Plane, 46.2381, 6.1090);
        let gc = haversine_distance(47.4647, 8.5492, 46.2381, 6.1090).unwrap();
        let d = flight_distance(&zrh, &gva).unwrap();
        assert!((d - (gc + FLIGHT_DETOUR_KM)).abs() < 1e-9);
        assert!((300.0..340.0).contains(&d), "unexpected ZRH-GVA distance {d}");
    }

    #[test]
    fn train_distance_scales_and_rounds() {
        for &((lat1, lon1), (lat2, lon2)) in SAMPLE_PAIRS {
            let a = location(TransportMode::Train, lat1, lon1);
            let b = location(TransportMode::Train, lat2, lon2);
            let expected = (haversine_distance(lat1, lon1, lat2, lon2).unwrap() * 1.2).round();
            assert!((train_distance(&a, &b).unwrap() - expected).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn travel_distance_dispatches_on_mode() {
        let a = location(TransportMode::Train, 47.3779, 8.5403);
        let b = location(TransportMode::Train, 46.2102, 6.1423);
        assert!(
            (travel_distance(TransportMode::Train, &a, &b).unwrap()
                - train_distance(&a, &b).unwrap())
            .abs()
                < f64::EPSILON
        );
        assert!(
            (travel_distance(TransportMode::Plane, &a, &b).unwrap()
                - flight_distance(&a, &b).unwrap())
            .abs()
                < f64::EPSILON
        );
    }
}
