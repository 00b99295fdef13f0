//! Fill-state derivation from sensor readings.

use crate::model::{Bin, BinMetadata, FillState, Reading};

/// Readings at or below this distance mark a bin as full.
pub const NEAR_FULL_THRESHOLD: f64 = 5.0;

/// Derive fill level and percentage from the latest reading.
///
/// Without a reading the sensor is assumed to see the bottom of the bin, so
/// the reported distance equals the capacity and the fill is zero.
#[must_use]
pub fn compute_fill(reading: Option<&Reading>, capacity: f64) -> FillState {
    let Some(reading) = reading else {
        return FillState {
            fill_level: 0.0,
            fill_percentage: 0.0,
            distance: capacity,
        };
    };

    let fill_level = capacity - reading.distance;
    let fill_percentage = if capacity <= 0.0 {
        0.0
    } else {
        fill_level / capacity * 100.0
    };

    FillState {
        fill_level,
        fill_percentage,
        distance: reading.distance,
    }
}

/// Apply a newly recorded reading to the cached full-state flag.
#[must_use]
pub fn update_full_state(mut bin: Bin, reading: &Reading) -> Bin {
    bin.is_full = reading.distance <= NEAR_FULL_THRESHOLD;
    bin
}

/// Build the per-request metadata for a bin.
#[must_use]
pub fn bin_metadata(bin: &Bin, latest: Option<&Reading>) -> BinMetadata {
    let fill = compute_fill(latest, bin.capacity);
    BinMetadata {
        id: bin.id.clone(),
        name: bin.name.clone(),
        location: bin.location,
        address: bin.address.clone(),
        fill_percentage: fill.fill_percentage,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::Utc;

    use super::*;
    use crate::model::{BinId, Coordinate, ReadingId};

    fn bin(capacity: f64) -> Bin {
        Bin {
            id: BinId::from("bin-1"),
            name: "Market square".to_owned(),
            location: Coordinate::new(52.52, 13.405),
            address: "Marktplatz 1".to_owned(),
            capacity,
            is_full: false,
        }
    }

    fn reading(distance: f64) -> Reading {
        Reading {
            id: ReadingId(1),
            bin_id: BinId::from("bin-1"),
            distance,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_stays_in_range_for_distances_within_capacity() {
        for capacity in [1.0, 40.0, 120.5] {
            for step in 0..=10 {
                let distance = capacity * f64::from(step) / 10.0;
                let fill = compute_fill(Some(&reading(distance)), capacity);
                assert!(
                    (0.0..=100.0).contains(&fill.fill_percentage),
                    "{} out of range for capacity {capacity}",
                    fill.fill_percentage
                );
            }
        }
    }

    #[test]
    fn half_full_bin() {
        let fill = compute_fill(Some(&reading(20.0)), 40.0);
        assert_relative_eq!(fill.fill_level, 20.0);
        assert_relative_eq!(fill.fill_percentage, 50.0);
        assert_relative_eq!(fill.distance, 20.0);
    }

    #[test]
    fn non_positive_capacity_reports_zero_percent() {
        for capacity in [0.0, -10.0] {
            let fill = compute_fill(Some(&reading(3.0)), capacity);
            assert_relative_eq!(fill.fill_percentage, 0.0);
        }
    }

    #[test]
    fn missing_reading_falls_back_to_empty() {
        let fill = compute_fill(None, 80.0);
        assert_relative_eq!(fill.fill_level, 0.0);
        assert_relative_eq!(fill.fill_percentage, 0.0);
        assert_relative_eq!(fill.distance, 80.0);
    }

    #[test]
    fn distance_beyond_capacity_is_not_clamped() {
        let fill = compute_fill(Some(&reading(50.0)), 40.0);
        assert_relative_eq!(fill.fill_level, -10.0);
        assert_relative_eq!(fill.fill_percentage, -25.0);
    }

    #[test]
    fn full_state_follows_threshold() {
        assert!(update_full_state(bin(40.0), &reading(NEAR_FULL_THRESHOLD)).is_full);
        assert!(update_full_state(bin(40.0), &reading(1.2)).is_full);
        assert!(!update_full_state(bin(40.0), &reading(5.01)).is_full);

        let mut full = bin(40.0);
        full.is_full = true;
        assert!(!update_full_state(full, &reading(30.0)).is_full);
    }

    #[test]
    fn metadata_carries_bin_fields() {
        let metadata = bin_metadata(&bin(40.0), Some(&reading(10.0)));
        assert_eq!(metadata.id, BinId::from("bin-1"));
        assert_eq!(metadata.name, "Market square");
        assert_eq!(metadata.address, "Marktplatz 1");
        assert_relative_eq!(metadata.fill_percentage, 75.0);
    }
}
