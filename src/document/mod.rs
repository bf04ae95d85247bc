//! Document side of a profile: QR code, zones, HTML preview and PDF export.

pub mod export;
pub mod html;
pub mod layout;
pub mod qr;
pub mod renderer;
pub mod routes;
