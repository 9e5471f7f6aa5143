pub mod claude;
mod http;
pub mod openai;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use openai::OpenAi;
pub use traits::ChatModel;
pub use util::{extract_json_object, truncate_to_char_boundary};
