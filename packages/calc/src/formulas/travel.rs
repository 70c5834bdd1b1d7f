//! Professional travel: distance times per-km impact.

use footprint_calc_models::{CalculationInputs, TravelInputs, TravelRecord, formula_version};
use footprint_factor_models::payload::{FlightFactor, TrainFactor};
use footprint_factor_models::{CabinClass, EmissionType, Location, LocationId, TransportMode};
use footprint_geodesy::{
    GeodesyError, flight_distance, haul_category, haversine_distance, train_distance,
};

use super::{Calculation, Lookup, round2};

/// Computes flight emissions.
///
/// `kg = distance * impact_score * rfi_adjustment * trips`, where the
/// distance includes the fixed detour allowance.
///
/// # Errors
///
/// Returns [`GeodesyError::InvalidCoordinate`] if either endpoint has
/// out-of-range coordinates.
pub fn calculate_flight_emission(
    origin: &Location,
    destination: &Location,
    cabin_class: Option<CabinClass>,
    trips: u32,
    factor: &Lookup<FlightFactor>,
) -> Result<Calculation, GeodesyError> {
    let great_circle_km = great_circle(origin, destination)?;
    let distance = flight_distance(origin, destination)?;

    let (kg_co2eq, incomplete_reason) = match factor {
        Ok(f) => (
            Some(round2(
                distance * f.impact_score * f.rfi_adjustment * f64::from(trips),
            )),
            None,
        ),
        Err(missing) => (None, Some(missing.to_string())),
    };

    Ok(Calculation {
        emission_type: EmissionType::Flight,
        kg_co2eq,
        distance_km: Some(round2(distance)),
        annual_kwh: None,
        factor_ids_used: factor.iter().map(|f| f.factor_id).collect(),
        formula_version: formula_version::FLIGHT,
        inputs: CalculationInputs::Flight(TravelInputs {
            haul_category: Some(haul_category(distance)),
            impact_score: factor.as_ref().ok().map(|f| f.impact_score),
            rfi_adjustment: factor.as_ref().ok().map(|f| f.rfi_adjustment),
            ..trip_inputs(
                TransportMode::Plane,
                origin,
                destination,
                cabin_class,
                trips,
                great_circle_km,
            )
        }),
        incomplete_reason,
    })
}

/// Computes train emissions.
///
/// `kg = distance * impact_score * trips`, where the distance is the
/// great-circle distance scaled for routing and rounded to whole km.
/// `country_code` is the lookup country the factor was resolved for.
///
/// # Errors
///
/// Returns [`GeodesyError::InvalidCoordinate`] if either endpoint has
/// out-of-range coordinates.
pub fn calculate_train_emission(
    origin: &Location,
    destination: &Location,
    cabin_class: Option<CabinClass>,
    trips: u32,
    country_code: &str,
    factor: &Lookup<TrainFactor>,
) -> Result<Calculation, GeodesyError> {
    let great_circle_km = great_circle(origin, destination)?;
    let distance = train_distance(origin, destination)?;

    let (kg_co2eq, incomplete_reason) = match factor {
        Ok(f) => (
            Some(round2(distance * f.impact_score * f64::from(trips))),
            None,
        ),
        Err(missing) => (None, Some(missing.to_string())),
    };

    Ok(Calculation {
        emission_type: EmissionType::Train,
        kg_co2eq,
        distance_km: Some(distance),
        annual_kwh: None,
        factor_ids_used: factor.iter().map(|f| f.factor_id).collect(),
        formula_version: formula_version::TRAIN,
        inputs: CalculationInputs::Train(TravelInputs {
            country_code: Some(country_code.to_string()),
            impact_score: factor.as_ref().ok().map(|f| f.impact_score),
            ..trip_inputs(
                TransportMode::Train,
                origin,
                destination,
                cabin_class,
                trips,
                great_circle_km,
            )
        }),
        incomplete_reason,
    })
}

/// An incomplete travel result for a trip whose endpoint is not in the
/// location directory.
#[must_use]
pub fn unknown_location(
    mode: TransportMode,
    record: &TravelRecord,
    missing: LocationId,
) -> Calculation {
    let inputs = TravelInputs {
        transport_mode: mode.to_string(),
        origin_location_id: record.origin_location_id,
        destination_location_id: record.destination_location_id,
        origin_name: None,
        destination_name: None,
        cabin_class: record.cabin_class,
        number_of_trips: record.number_of_trips,
        great_circle_km: None,
        haul_category: None,
        country_code: None,
        impact_score: None,
        rfi_adjustment: None,
    };
    let (emission_type, formula_version, inputs) = match mode {
        TransportMode::Plane => (
            EmissionType::Flight,
            formula_version::FLIGHT,
            CalculationInputs::Flight(inputs),
        ),
        TransportMode::Train => (
            EmissionType::Train,
            formula_version::TRAIN,
            CalculationInputs::Train(inputs),
        ),
    };

    Calculation {
        emission_type,
        kg_co2eq: None,
        distance_km: None,
        annual_kwh: None,
        factor_ids_used: Vec::new(),
        formula_version,
        inputs,
        incomplete_reason: Some(format!("unknown location {missing}")),
    }
}

fn great_circle(origin: &Location, destination: &Location) -> Result<f64, GeodesyError> {
    haversine_distance(
        origin.latitude,
        origin.longitude,
        destination.latitude,
        destination.longitude,
    )
}

fn trip_inputs(
    mode: TransportMode,
    origin: &Location,
    destination: &Location,
    cabin_class: Option<CabinClass>,
    trips: u32,
    great_circle_km: f64,
) -> TravelInputs {
    TravelInputs {
        transport_mode: mode.to_string(),
        origin_location_id: origin.id,
        destination_location_id: destination.id,
        origin_name: Some(origin.name.clone()),
        destination_name: Some(destination.name.clone()),
        cabin_class,
        number_of_trips: trips,
        great_circle_km: Some(great_circle_km),
        haul_category: None,
        country_code: None,
        impact_score: None,
        rfi_adjustment: None,
    }
}
