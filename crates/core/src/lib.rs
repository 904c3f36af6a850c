pub mod base_url;
pub mod config;
pub mod domain;
pub mod errors;
pub mod intent;
pub mod ranking;

pub use base_url::{BaseUrlResolver, RequestOrigin};
pub use domain::location::{LocationCandidates, LocationSelector};
pub use domain::offers::{HotelOffer, Money, Rate, RateSearchResponse, RoomTypeOffer};
pub use domain::places::{PlaceQuery, PlaceResolution};
pub use domain::rates::{Occupancy, RateFilters, RateSearchParams, RateSearchRequest};
pub use errors::{ErrorClass, InterfaceError, SearchError, ValidationError};
pub use intent::{DecodedIntent, HeuristicIntentDecoder, IntentDecoder};
pub use ranking::{normalize, RankOrder, RankedHotelView, RatesDisplay};
