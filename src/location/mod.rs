//! Location normalization: free-form listing text → (city, country)
//!
//! - [`CountryIndex`]: persisted country → cities JSON file
//! - [`Geocoder`] / [`NominatimGeocoder`]: remote lookup
//! - [`LocationResolver`]: memory → index → remote tiers
//! - [`CountryNormalizer`]: spelling variants → canonical country name

pub mod geocoder;
pub mod index;
pub mod normalizer;
pub mod resolver;

pub use geocoder::{Geocoder, GeocoderSettings, NominatimGeocoder};
pub use index::CountryIndex;
pub use normalizer::CountryNormalizer;
pub use resolver::{LocationResolver, normalize_city};
