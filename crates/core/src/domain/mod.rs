pub mod location;
pub mod offers;
pub mod places;
pub mod rates;
