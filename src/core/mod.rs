pub mod geometry;
pub mod irradiance;
pub mod radiosity;
pub mod units;
pub mod view_factors;
