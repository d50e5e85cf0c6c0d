pub mod pagination;
pub mod params;
pub mod validated;

pub use pagination::{PageRequest, Pagination};
pub use params::{double_option, parse_enum, parse_flag, parse_id, parse_id_filter};
pub use validated::ValidatedJson;
