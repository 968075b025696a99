//! Crate-wide constants.

/// Application name, used for data directories and default paths.
pub const APP_NAME: &str = "qtmd";

/// Number of hex characters kept from a SHA-256 when naming store objects.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Marker file written into a build directory once the package was verified.
pub const BUILD_COMPLETE_MARKER: &str = ".qtmd-complete";

/// File name of the package description written into the package folder.
pub const PACKAGE_INFO_FILE: &str = "package_info.json";

/// File name of a package descriptor inside the registry.
pub const DESCRIPTOR_FILE: &str = "package.toml";

/// Placeholder path segment used in the registry for a missing user or channel.
pub const REGISTRY_EMPTY_SEGMENT: &str = "_";

/// SOURCE_DATE_EPOCH passed to external tools (1980-01-01, the ZIP epoch).
pub const SOURCE_DATE_EPOCH: &str = "315532800";
