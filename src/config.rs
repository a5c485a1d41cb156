use crate::cloak::{ColorThresholds, HueBand};
use crate::error::CloakError;

pub const DEFAULT_ALPHA: f32 = 0.04;

/// Tunables for the per-frame pipeline, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CloakConfig {
    /// Background update rate in (0, 1].
    pub alpha: f32,
    pub thresholds: ColorThresholds,
    /// Radius of the square structuring element; 1 gives 3x3.
    pub kernel_radius: u8,
    pub open_iterations: u32,
    pub dilate_iterations: u32,
    /// Flip frames horizontally before processing.
    pub mirror: bool,
}

impl Default for CloakConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            thresholds: ColorThresholds::RED,
            kernel_radius: 1,
            open_iterations: 2,
            dilate_iterations: 1,
            mirror: true,
        }
    }
}

impl CloakConfig {
    pub fn validate(&self) -> Result<(), CloakError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(CloakError::InvalidConfig(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }

        if self.kernel_radius == 0 {
            return Err(CloakError::InvalidConfig(
                "kernel radius must be at least 1".into(),
            ));
        }

        for band in HueBand::ALL {
            let range = self.thresholds.band(band);
            let (lo, hi) = (range.lower, range.upper);
            if hi.h > 180 {
                return Err(CloakError::InvalidConfig(format!(
                    "{band:?} hue band ends at {}, beyond 180",
                    hi.h
                )));
            }
            if lo.h > hi.h || lo.s > hi.s || lo.v > hi.v {
                return Err(CloakError::InvalidConfig(format!(
                    "{band:?} band is empty: {lo:?}..={hi:?}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CloakConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alpha, 0.04);
        assert_eq!(config.thresholds, ColorThresholds::RED);
    }

    #[test]
    fn alpha_bounds() {
        for alpha in [0.0, -0.1, 1.01, f32::NAN] {
            let config = CloakConfig {
                alpha,
                ..CloakConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(CloakError::InvalidConfig(_))),
                "alpha {alpha} accepted"
            );
        }
        let config = CloakConfig {
            alpha: 1.0,
            ..CloakConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_or_out_of_range_bands_are_rejected() {
        let mut config = CloakConfig::default();
        config.thresholds.low.upper.h = 200;
        assert!(config.validate().is_err());

        let mut config = CloakConfig::default();
        config.thresholds.high.lower.s = 255;
        config.thresholds.high.upper.s = 100;
        assert!(config.validate().is_err());
    }
}
