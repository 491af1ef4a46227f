pub const PROVIDER_INATURALIST: &str = "inaturalist";
pub const PROVIDER_ANTWIKI: &str = "antwiki";
pub const PROVIDER_ANTONTOP: &str = "antontop";

/// Fixed photo precedence, independent of which provider answered first.
pub const PHOTO_PRIORITY: [&str; 3] = [PROVIDER_INATURALIST, PROVIDER_ANTWIKI, PROVIDER_ANTONTOP];
