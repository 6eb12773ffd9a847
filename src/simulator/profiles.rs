//! Piecewise random profiles driving every synthetic reading.
//!
//! Each profile is a uniform draw whose range depends only on the hour of day
//! and whether the day is a weekend. Hour ranges are inclusive at both ends.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use rand::Rng;

// ---

/// Calendar position of a tick, as far as the profiles care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfWeek {
    // ---
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Saturday or Sunday.
    pub weekend: bool,
}

impl TimeOfWeek {
    // ---
    /// Hour and weekday of `at` in its own time zone.
    pub fn of<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self {
            hour: at.hour(),
            weekend: at.weekday().num_days_from_monday() >= 5,
        }
    }
}

/// A uniform draw from `peak` during `peak_hours`, from `off_peak` otherwise.
#[derive(Debug, Clone, Copy)]
struct Band {
    peak_hours: (u32, u32),
    peak: (f64, f64),
    off_peak: (f64, f64),
}

impl Band {
    fn draw<R: Rng>(&self, hour: u32, rng: &mut R) -> f64 {
        let (first, last) = self.peak_hours;
        let (low, high) = if (first..=last).contains(&hour) {
            self.peak
        } else {
            self.off_peak
        };
        rng.random_range(low..=high)
    }
}

/// Split between weekday and weekend behaviour.
#[derive(Debug, Clone, Copy)]
struct WeeklyBand {
    weekday: Band,
    weekend: Band,
}

impl WeeklyBand {
    fn draw<R: Rng>(&self, at: TimeOfWeek, rng: &mut R) -> f64 {
        let band = if at.weekend { &self.weekend } else { &self.weekday };
        band.draw(at.hour, rng)
    }
}

const OUTDOOR: WeeklyBand = WeeklyBand {
    weekday: Band {
        peak_hours: (6, 18),
        peak: (15.0, 25.0),
        off_peak: (10.0, 15.0),
    },
    weekend: Band {
        peak_hours: (8, 20),
        peak: (14.0, 24.0),
        off_peak: (9.0, 14.0),
    },
};

const HVAC: WeeklyBand = WeeklyBand {
    weekday: Band {
        peak_hours: (7, 19),
        peak: (8.0, 15.0),
        off_peak: (4.0, 8.0),
    },
    weekend: Band {
        peak_hours: (9, 21),
        peak: (6.0, 12.0),
        off_peak: (3.0, 6.0),
    },
};

const LIGHTING: Band = Band {
    peak_hours: (6, 20),
    peak: (3.0, 7.0),
    off_peak: (1.0, 3.0),
};

const EQUIPMENT: Band = Band {
    peak_hours: (8, 18),
    peak: (5.0, 10.0),
    off_peak: (2.0, 5.0),
};

/// Outdoor temperature in °C.
pub fn external_temperature<R: Rng>(at: TimeOfWeek, rng: &mut R) -> f64 {
    OUTDOOR.draw(at, rng)
}

/// HVAC plant energy for one tick.
pub fn hvac_energy<R: Rng>(at: TimeOfWeek, rng: &mut R) -> f64 {
    HVAC.draw(at, rng)
}

/// Lighting energy for one tick; same on weekdays and weekends.
pub fn lighting_energy<R: Rng>(at: TimeOfWeek, rng: &mut R) -> f64 {
    LIGHTING.draw(at.hour, rng)
}

/// Equipment energy for one tick; same on weekdays and weekends.
pub fn equipment_energy<R: Rng>(at: TimeOfWeek, rng: &mut R) -> f64 {
    EQUIPMENT.draw(at.hour, rng)
}

/// Relative humidity (%) drawn from `range`; no state and no feedback.
pub fn humidity<R: Rng>(range: (f64, f64), rng: &mut R) -> f64 {
    rng.random_range(range.0..=range.1)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;
    use rand::{rngs::StdRng, SeedableRng};

    fn weekday(hour: u32) -> TimeOfWeek {
        TimeOfWeek { hour, weekend: false }
    }

    fn weekend(hour: u32) -> TimeOfWeek {
        TimeOfWeek { hour, weekend: true }
    }

    fn assert_draws_within<F>(mut draw: F, low: f64, high: f64)
    where
        F: FnMut(&mut StdRng) -> f64,
    {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let v = draw(&mut rng);
            assert!((low..=high).contains(&v), "{v} not in [{low}, {high}]");
        }
    }

    #[test]
    fn test_time_of_week_detects_weekend() {
        // ---
        // 2025-03-29 is a Saturday, 2025-03-31 a Monday.
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 29)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        let monday = NaiveDate::from_ymd_opt(2025, 3, 31)
            .unwrap()
            .and_hms_opt(3, 0, 0)
            .unwrap();

        let sat = TimeOfWeek::of(&saturday.and_utc());
        let mon = TimeOfWeek::of(&monday.and_utc());

        assert_eq!(sat, weekend(14));
        assert_eq!(mon, weekday(3));
    }

    #[test]
    fn test_external_temperature_bands() {
        // ---
        assert_draws_within(|r| external_temperature(weekday(6), r), 15.0, 25.0);
        assert_draws_within(|r| external_temperature(weekday(18), r), 15.0, 25.0);
        assert_draws_within(|r| external_temperature(weekday(19), r), 10.0, 15.0);
        assert_draws_within(|r| external_temperature(weekend(7), r), 9.0, 14.0);
        assert_draws_within(|r| external_temperature(weekend(20), r), 14.0, 24.0);
    }

    #[test]
    fn test_hvac_energy_bands() {
        // ---
        assert_draws_within(|r| hvac_energy(weekday(7), r), 8.0, 15.0);
        assert_draws_within(|r| hvac_energy(weekday(20), r), 4.0, 8.0);
        assert_draws_within(|r| hvac_energy(weekend(21), r), 6.0, 12.0);
        assert_draws_within(|r| hvac_energy(weekend(8), r), 3.0, 6.0);
    }

    #[test]
    fn test_lighting_and_equipment_ignore_weekend() {
        // ---
        for day in [weekday, weekend] {
            assert_draws_within(|r| lighting_energy(day(20), r), 3.0, 7.0);
            assert_draws_within(|r| lighting_energy(day(5), r), 1.0, 3.0);
            assert_draws_within(|r| equipment_energy(day(8), r), 5.0, 10.0);
            assert_draws_within(|r| equipment_energy(day(19), r), 2.0, 5.0);
        }
    }

    #[test]
    fn test_humidity_stays_in_range() {
        // ---
        assert_draws_within(|r| humidity((30.0, 50.0), r), 30.0, 50.0);
    }

    #[test]
    fn test_draws_repeat_for_same_seed() {
        // ---
        let at = weekday(12);
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let run_a: Vec<f64> = (0..10).map(|_| hvac_energy(at, &mut a)).collect();
        let run_b: Vec<f64> = (0..10).map(|_| hvac_energy(at, &mut b)).collect();
        assert_eq!(run_a, run_b);
    }
}
