pub const HEALTH_ROUTE: &str = "/health";
pub const VERSION_ROUTE: &str = "/version";

/// Every closet route below is nested under this prefix.
pub const CLOSET_BASE_PATH: &str = "/closet";

pub const CLOTHES_ROUTE: &str = "/";
/// Nesting only answers the bare prefix, so the slash form is routed on its own.
pub const CLOSET_INDEX_ROUTE: &str = "/closet/";
pub const SEARCH_ROUTE: &str = "/search";
pub const OUTFITS_ROUTE: &str = "/outfits";
pub const OUTFIT_DETAILS_ROUTE: &str = "/outfits/{id}";
pub const OPTIONS_ROUTE: &str = "/options";
pub const ADD_ROUTE: &str = "/add";
pub const DELETE_ROUTE: &str = "/delete/{id}";

/// Media type declared in every image data URI.
pub const IMAGE_MEDIA_TYPE: &str = "image/jpeg";
