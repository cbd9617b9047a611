use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parses DRF-style ordering values: `field` ascending, `-field` descending.
    pub fn from_ordering(value: &str, field: &str) -> Option<Self> {
        match value.strip_prefix('-') {
            Some(rest) if rest == field => Some(SortOrder::Desc),
            None if value == field => Some(SortOrder::Asc),
            _ => None,
        }
    }
}
