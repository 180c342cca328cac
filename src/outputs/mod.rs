//! Output generation for the scraper.
//!
//! # Submodules
//!
//! - [`json`]: Loads and rewrites the metadata file that doubles as resume state
//!
//! # Output Structure
//!
//! ```text
//! outputs/
//! ├── metadata.json   # every bill collected so far
//! ├── HB00001.pdf     # filed texts, named after the URL's last segment
//! └── HB00002.pdf
//! ```

pub mod json;
