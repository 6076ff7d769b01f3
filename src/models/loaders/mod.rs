pub mod csv_loader;

pub use csv_loader::{list_csv_files, load_raw_rows, load_species_rows, save_species_rows};
