// Domain layer: value types and the ports (capabilities) the engine is built against.

pub mod model;
pub mod ports;
