//! Command-line interface definitions for the house bill scraper.
//!
//! All arguments can be provided via command-line flags or environment variables.

use clap::Parser;

/// Command-line arguments for the scraper.
///
/// # Examples
///
/// ```sh
/// # Resume into the default metadata file with a visible browser
/// house_bill_scraper
///
/// # Headless, different output locations
/// house_bill_scraper --headless --metadata data/bills.json --download-dir data/pdf/
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Legislative documents listing to scrape
    #[arg(
        long,
        env = "LISTING_URL",
        default_value = "https://congress.gov.ph/legislative-documents/"
    )]
    pub listing_url: String,

    /// JSON metadata file read at startup and rewritten at shutdown
    #[arg(short, long, env = "METADATA_PATH", default_value = "outputs/metadata.json")]
    pub metadata: String,

    /// Directory that receives downloaded bill texts
    #[arg(short, long, env = "DOWNLOAD_DIR", default_value = "outputs/")]
    pub download_dir: String,

    /// Id of the congress dropdown to expand on the listing page
    #[arg(long, env = "CONGRESS", default_value = "20th Congress")]
    pub congress: String,

    /// Run the browser without a window
    #[arg(long, env = "HEADLESS")]
    pub headless: bool,

    /// Records per listing page
    #[arg(long, env = "PAGE_SIZE", default_value_t = crate::config::PAGE_SIZE)]
    pub page_size: usize,

    /// Highest listing page to extract
    #[arg(long, env = "MAX_PAGES", default_value_t = crate::config::MAX_PAGES)]
    pub max_pages: usize,

    /// Remote storage location for bill texts (used by the upload step, not the scraper)
    #[arg(long, env = "AWS_BUCKET_DATA_LOCATION")]
    pub aws_bucket_data_location: Option<String>,

    /// Remote storage location for the metadata file (used by the upload step, not the scraper)
    #[arg(long, env = "AWS_BUCKET_METADATA_LOCATION")]
    pub aws_bucket_metadata_location: Option<String>,
}
