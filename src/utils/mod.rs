pub mod constants;
pub mod string_utils;
pub mod url_utils;

pub use constants::*;
pub use string_utils::{collapse_whitespace, is_unknown, or_unknown};
pub use url_utils::{is_valid_url, resolve_link, with_query_param};
