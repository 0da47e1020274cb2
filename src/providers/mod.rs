pub mod anthropic;
pub mod factory;
pub mod http_client;
pub mod scrub;
pub mod traits;

pub use anthropic::AnthropicGenerator;
pub use factory::create_generator;
pub use scrub::{api_error, sanitize_api_error, scrub_secret_patterns};
pub use traits::Generator;
