pub mod csv;
pub mod geo;
pub mod jwt;
