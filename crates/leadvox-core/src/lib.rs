pub mod classifier;
pub mod clock;
pub mod config;
pub mod dates;
pub mod executor;
pub mod extractor;
pub mod intent;
pub mod prompts;
pub mod resolver;
pub mod router;
pub mod structured;

pub use classifier::IntentClassifier;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{load_config, validate_config, LeadvoxConfig};
pub use executor::{columns, validate_status, ActionExecutor};
pub use extractor::FieldExtractor;
pub use intent::IntentSpec;
pub use resolver::{EntityResolver, LeadMatch};
pub use router::{IntentRouter, Preview, RouterOptions};
