mod csv;
pub use csv::*;
mod json;
pub use json::*;
