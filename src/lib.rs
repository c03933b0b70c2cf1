mod card_types;
mod config;
mod error;
mod requests;
mod text_manipulators;

mod detail_scraper;
mod history_scraper;

pub use card_types::{available_acronyms, city_card_code};
pub use config::{LoadFromEnv, TransportConfig};
pub use detail_scraper::{Detail, DetailScraper, parse_detail};
pub use error::{Error, FieldError, FieldErrorKind};
pub use history_scraper::{HistoryOutcome, HistoryScraper, Ticket, parse_history};
