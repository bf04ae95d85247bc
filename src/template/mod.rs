pub mod editor;
pub mod model;
pub mod persistence;
pub mod routes;
pub mod store;
