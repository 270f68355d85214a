pub mod fluxnet_reader;
pub mod land_cover_reader;
pub mod modis_reader;
pub mod swath_reader;
pub mod table_reader;

pub use fluxnet_reader::{FluxnetReader, FluxnetTable};
pub use land_cover_reader::LandCoverMap;
pub use modis_reader::ModisReader;
pub use swath_reader::{SwathGrid, SwathReader};
pub use table_reader::TableReader;
