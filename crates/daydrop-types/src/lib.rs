pub mod api;
pub mod events;
pub mod lookup;
pub mod models;

pub use lookup::Lookup;
