pub mod controller;
pub mod model;
pub mod provider;
pub mod routes;
pub mod validation;
pub mod view;
