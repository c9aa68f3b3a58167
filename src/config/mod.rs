pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{load_site_file, load_sites};
pub use models::*;
pub use validation::{SiteValidator, ValidationError, ValidationResult};
