//! Catalog model and Gazelle payload parsing.

pub mod context;
mod fields;
pub mod model;
pub mod parser;

pub use context::{
    CollageUrlError, SearchQuery, collage_max_size, extract_search_max, group_id,
    parse_collage_url,
};
pub use fields::{as_int, int_field, str_field};
pub use model::{Edition, Group, SearchHit, Torrent};
pub use parser::{parse_group_from_browse, parse_group_hybrid, parse_torrentgroup_response};
