use crate::config::ControlConfig;

/// Sizes the in-service fleet for the coming horizon from current and
/// forecast demand.
#[derive(Debug, Clone)]
pub struct DispatchSizer {
    bus_capacity: u32,
    min_service_floor: u32,
}

impl DispatchSizer {
    /// The service floor is half the base frequency: a near-empty route still
    /// keeps a skeleton service running.
    pub fn new(config: &ControlConfig) -> Self {
        Self::with_floor(config.bus_capacity, config.base_frequency / 2)
    }

    pub fn with_floor(bus_capacity: u32, min_service_floor: u32) -> Self {
        Self {
            bus_capacity,
            min_service_floor,
        }
    }

    /// Buses to run this horizon, from averaged current and forecast demand
    /// (passengers per hour). Demand never requests more buses than are
    /// physically available, and service never drops below the floor.
    pub fn size(&self, current_demand: f64, forecast_demand: f64, available_buses: u32) -> u32 {
        let avg_demand = (current_demand + forecast_demand) / 2.0;
        let required = (avg_demand / self.bus_capacity as f64).ceil() as u32;
        required.min(available_buses).max(self.min_service_floor)
    }
}
