// Domain layer: manifest model, diagnostics and ports. No I/O here.

pub mod model;
pub mod ports;
