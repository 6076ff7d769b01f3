pub mod inat;
pub mod loaders;
pub mod species;

pub use inat::{ObservationDetails, ObservationPhoto};
pub use loaders::{list_csv_files, load_raw_rows, load_species_rows, save_species_rows};
pub use species::{RawRow, SpeciesRow, NOT_AVAILABLE};
