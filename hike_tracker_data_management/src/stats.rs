use hike_tracker_lib::trip_record::TripRecord;

/// Aggregate figures shown on the profile screen.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileStats {
    pub total_hikes: usize,
    pub total_distance_km: f64,
    pub total_calories: u64,
    pub total_duration_secs: u64,
}

impl ProfileStats {
    pub fn from_records(records: &[TripRecord]) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.record(record);
        }
        stats
    }

    pub fn record(&mut self, trip: &TripRecord) {
        self.total_hikes += 1;
        self.total_distance_km += trip.distance_km;
        self.total_calories += u64::from(trip.calories_burned);
        self.total_duration_secs = self.total_duration_secs.saturating_add(trip.duration_secs);
    }
}
