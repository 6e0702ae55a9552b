use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, Group};
use crate::filter::FilterNode;
use crate::sort::Sort;

/// Normalized grid request. Constructed once per call by one of the wire
/// parsers and immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridRequest {
    pub filter: Option<FilterNode>,
    #[serde(default)]
    pub sort: Vec<Sort>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub aggregates: Vec<Aggregate>,
    pub take: Option<usize>,
    pub skip: Option<usize>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl GridRequest {
    /// Resolve paging to a skip/take pair. Explicit skip/take wins over
    /// page/page_size; with neither present no paging is applied. A bare
    /// page_size reads as page 1.
    pub fn resolved_skip_take(&self) -> (Option<usize>, Option<usize>) {
        if self.skip.is_some() || self.take.is_some() {
            return (self.skip, self.take);
        }
        match self.page_size {
            Some(size) => {
                let page = self.page.unwrap_or(1).max(1);
                (Some((page - 1) * size), Some(size))
            }
            None => (None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_take_wins_over_page() {
        let request = GridRequest {
            skip: Some(5),
            take: Some(10),
            page: Some(3),
            page_size: Some(20),
            ..Default::default()
        };
        assert_eq!(request.resolved_skip_take(), (Some(5), Some(10)));
    }

    #[test]
    fn page_derives_skip() {
        let request = GridRequest {
            page: Some(3),
            page_size: Some(20),
            ..Default::default()
        };
        assert_eq!(request.resolved_skip_take(), (Some(40), Some(20)));
    }

    #[test]
    fn bare_page_size_is_page_one() {
        let request = GridRequest {
            page_size: Some(20),
            ..Default::default()
        };
        assert_eq!(request.resolved_skip_take(), (Some(0), Some(20)));
    }

    #[test]
    fn no_paging() {
        assert_eq!(GridRequest::default().resolved_skip_take(), (None, None));
    }
}
