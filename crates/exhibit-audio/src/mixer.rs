//! Gain staging: master volume and concurrent-track auto-balance.

/// Default lowest balance factor, so a crowded mix never mutes a track.
pub const DEFAULT_BALANCE_FLOOR: f32 = 0.2;

/// Computes the effective per-track gain pushed to the output graph.
#[derive(Debug, Clone)]
pub struct Mixer {
    /// Master volume (0.0 to 1.0).
    pub master_volume: f32,
    /// Lowest balance factor.
    pub balance_floor: f32,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(1.0, DEFAULT_BALANCE_FLOOR)
    }
}

impl Mixer {
    pub fn new(master_volume: f32, balance_floor: f32) -> Self {
        Self {
            master_volume: master_volume.clamp(0.0, 1.0),
            balance_floor: balance_floor.clamp(0.0, 1.0),
        }
    }

    /// Scale applied to every track when `active` tracks play together:
    /// `max(floor, 1 / sqrt(active))`.
    pub fn balance_factor(&self, active: usize) -> f32 {
        if active <= 1 {
            return 1.0;
        }
        (1.0 / (active as f32).sqrt()).max(self.balance_floor)
    }

    /// Effective gain for a track at `nominal` volume among `active` tracks.
    pub fn effective_gain(&self, nominal: f32, active: usize) -> f32 {
        nominal.clamp(0.0, 1.0) * self.balance_factor(active)
    }
}
