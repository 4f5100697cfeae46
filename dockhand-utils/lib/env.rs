//! Utility functions for working with environment variables.

use crate::DEFAULT_DATA_IMAGE;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Environment variable overriding the image used for data containers.
pub const DATA_IMAGE_ENV_VAR: &str = "DOCKHAND_DATA_IMAGE";

/// Environment variable overriding the Docker endpoint dockhand connects to.
///
/// When unset, the runtime client falls back to the platform's local daemon
/// socket (which itself honors the standard `DOCKER_HOST`).
pub const DOCKER_HOST_ENV_VAR: &str = "DOCKHAND_DOCKER_HOST";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the image reference used for auto-provisioned data containers.
/// If the DOCKHAND_DATA_IMAGE environment variable is set, returns that value.
/// Otherwise, returns the default data image.
pub fn get_data_image() -> String {
    if let Ok(image) = std::env::var(DATA_IMAGE_ENV_VAR) {
        image
    } else {
        DEFAULT_DATA_IMAGE.to_string()
    }
}

/// Returns the Docker endpoint override, if one is configured.
pub fn get_docker_host() -> Option<String> {
    std::env::var(DOCKER_HOST_ENV_VAR).ok()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_data_image() {
        std::env::remove_var(DATA_IMAGE_ENV_VAR);
        assert_eq!(get_data_image(), DEFAULT_DATA_IMAGE);

        std::env::set_var(DATA_IMAGE_ENV_VAR, "alpine:3.20");
        assert_eq!(get_data_image(), "alpine:3.20");
        std::env::remove_var(DATA_IMAGE_ENV_VAR);
    }

    #[test]
    #[serial]
    fn test_get_docker_host() {
        std::env::remove_var(DOCKER_HOST_ENV_VAR);
        assert_eq!(get_docker_host(), None);

        std::env::set_var(DOCKER_HOST_ENV_VAR, "http://localhost:2375");
        assert_eq!(get_docker_host().as_deref(), Some("http://localhost:2375"));
        std::env::remove_var(DOCKER_HOST_ENV_VAR);
    }
}
