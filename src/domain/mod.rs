// Domain layer: the project closure model and the ports the export pipeline is written against.

pub mod model;
pub mod ports;
