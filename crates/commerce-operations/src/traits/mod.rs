mod data_access_port;

pub use data_access_port::{DataAccessPort, HasPort};
