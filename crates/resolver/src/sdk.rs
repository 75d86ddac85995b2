//! SDK version bounds

use serde::Serialize;
use varsign_core::config::SdkConfig;
use varsign_core::error::{Error, Result};

/// Effective platform versions for the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SdkBounds {
    /// Declared minimum raised to the floor
    pub min_sdk: u32,
    /// Target API level
    pub target_sdk: u32,
    /// API level compiled against
    pub compile_sdk: u32,
}

/// Apply the minimum floor and check `min <= target <= compile`
pub fn resolve_sdk(config: &SdkConfig) -> Result<SdkBounds> {
    if config.compile_sdk == 0 {
        return Err(Error::invalid_value("sdk.compile_sdk", "must be greater than zero"));
    }

    let min_sdk = config.min_sdk.max(config.min_sdk_floor);
    if min_sdk != config.min_sdk {
        tracing::debug!(
            declared = config.min_sdk,
            floor = config.min_sdk_floor,
            "Raised minSdk to floor"
        );
    }

    if min_sdk > config.target_sdk {
        return Err(Error::invalid_value(
            "sdk.target_sdk",
            format!("{} is below the effective minSdk {}", config.target_sdk, min_sdk),
        ));
    }
    if config.target_sdk > config.compile_sdk {
        return Err(Error::invalid_value(
            "sdk.target_sdk",
            format!(
                "{} is above compileSdk {}",
                config.target_sdk, config.compile_sdk
            ),
        ));
    }

    Ok(SdkBounds {
        min_sdk,
        target_sdk: config.target_sdk,
        compile_sdk: config.compile_sdk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use varsign_core::ErrorCode;

    fn sdk(min: u32, floor: u32, target: u32, compile: u32) -> SdkConfig {
        SdkConfig {
            compile_sdk: compile,
            min_sdk: min,
            min_sdk_floor: floor,
            target_sdk: target,
        }
    }

    #[test]
    fn test_floor_raises_low_minimum() {
        let bounds = resolve_sdk(&sdk(21, 23, 34, 35)).unwrap();
        assert_eq!(bounds.min_sdk, 23);
        assert_eq!(bounds.target_sdk, 34);
        assert_eq!(bounds.compile_sdk, 35);
    }

    #[test]
    fn test_higher_minimum_kept() {
        let bounds = resolve_sdk(&sdk(26, 23, 35, 35)).unwrap();
        assert_eq!(bounds.min_sdk, 26);
    }

    #[test]
    fn test_target_below_min_rejected() {
        let err = resolve_sdk(&sdk(21, 23, 22, 35)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
        assert!(err.is_config_error());
    }

    #[test]
    fn test_target_above_compile_rejected() {
        let err = resolve_sdk(&sdk(23, 23, 36, 35)).unwrap_err();
        assert!(err.message.contains("compileSdk 35"));
    }

    #[test]
    fn test_zero_compile_rejected() {
        assert!(resolve_sdk(&sdk(0, 0, 0, 0)).is_err());
    }
}
