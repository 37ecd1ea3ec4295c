pub mod exporter;
pub mod io;
pub mod materialize;
pub mod settings;
pub mod util;
