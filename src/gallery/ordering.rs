use super::CompositionRequest;
use crate::library::{DynMediaProvider, MediaId, MediaMetadata, SortDirection};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Reorders an id list by a named field.
pub trait ImageOrderer: Send + Sync {
    fn order(&self, ids: Vec<MediaId>, field: &str, direction: SortDirection) -> Vec<MediaId>;
}

/// Sorts by media metadata using one bulk fetch. Items without metadata go
/// last, in their original order.
pub struct MetadataOrderer {
    media: DynMediaProvider,
}

impl MetadataOrderer {
    pub fn new(media: DynMediaProvider) -> Self {
        Self { media }
    }
}

fn file_name(meta: &MediaMetadata) -> String {
    meta.file
        .as_deref()
        .and_then(|file| file.rsplit('/').next())
        .unwrap_or_default()
        .to_lowercase()
}

type Comparator = fn(&MediaMetadata, &MediaMetadata) -> Ordering;

fn comparator(field: &str) -> Option<Comparator> {
    let compare: Comparator = match field {
        "date" => |a, b| a.date.cmp(&b.date),
        "modified" => |a, b| a.modified.cmp(&b.modified),
        "title" => |a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        "filename" => |a, b| file_name(a).cmp(&file_name(b)),
        "menu_order" => |a, b| a.menu_order.cmp(&b.menu_order),
        _ => return None,
    };
    Some(compare)
}

impl ImageOrderer for MetadataOrderer {
    fn order(&self, ids: Vec<MediaId>, field: &str, direction: SortDirection) -> Vec<MediaId> {
        let field = field.trim().to_ascii_lowercase();
        if field.is_empty() || field == "none" {
            return ids;
        }
        let Some(compare) = comparator(&field) else {
            warn!("Unknown order field '{}', keeping the original order", field);
            return ids;
        };

        let metadata = self.media.metadata_for(&ids);
        let (mut known, unknown): (Vec<MediaId>, Vec<MediaId>) =
            ids.into_iter().partition(|id| metadata.contains_key(id));

        known.sort_by(|a, b| {
            let ordering = compare(&metadata[a], &metadata[b]);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        known.extend(unknown);
        known
    }
}

/// The field and direction requested by `order_by` (`field-direction`) or
/// by `orderby` plus `order`. `order_by` wins when both are valid.
pub fn order_rule(request: &CompositionRequest) -> Option<(String, SortDirection)> {
    if let Some(token) = request.text("order_by").filter(|token| !token.is_empty()) {
        let parts: Vec<&str> = token.split('-').collect();
        if let [field, direction] = parts.as_slice() {
            let direction = direction.parse().unwrap_or_default();
            return Some((field.to_string(), direction));
        }
        warn!(
            "Ignoring malformed order_by '{}', expected 'field-direction'",
            token
        );
    }

    let field = request.text("orderby").filter(|field| !field.is_empty())?;
    let direction = request
        .text("order")
        .map(|order| order.parse().unwrap_or_default())
        .unwrap_or_default();
    Some((field, direction))
}

pub fn apply_order(
    orderer: &dyn ImageOrderer,
    ids: Vec<MediaId>,
    request: &CompositionRequest,
) -> Vec<MediaId> {
    match order_rule(request) {
        Some((field, direction)) => {
            debug!("Ordering {} ids by {} {:?}", ids.len(), field, direction);
            orderer.order(ids, &field, direction)
        }
        None => ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Library, test_helpers::sample_library};
    use std::sync::Arc;

    fn orderer() -> MetadataOrderer {
        let library: Arc<Library> = Arc::new(sample_library());
        MetadataOrderer::new(library)
    }

    #[test]
    fn test_order_rule_precedence() {
        let request = CompositionRequest::new()
            .with("orderby", "title")
            .with("order", "desc")
            .with("order_by", "date-asc");
        assert_eq!(
            order_rule(&request),
            Some(("date".to_string(), SortDirection::Asc))
        );

        let request = CompositionRequest::new()
            .with("orderby", "title")
            .with("order", "desc");
        assert_eq!(
            order_rule(&request),
            Some(("title".to_string(), SortDirection::Desc))
        );
    }

    #[test]
    fn test_malformed_order_by_is_ignored() {
        let request = CompositionRequest::new().with("order_by", "menu-order-desc");
        assert_eq!(order_rule(&request), None);

        let request = CompositionRequest::new().with("order_by", "date");
        assert_eq!(order_rule(&request), None);
    }

    #[test]
    fn test_orders_by_date_both_directions() {
        let orderer = orderer();
        assert_eq!(
            orderer.order(vec![3, 1, 2], "date", SortDirection::Asc),
            vec![1, 2, 3]
        );
        assert_eq!(
            orderer.order(vec![3, 1, 2], "date", SortDirection::Desc),
            vec![3, 2, 1]
        );
    }

    #[test]
    fn test_title_order_and_missing_metadata_last() {
        // Titles run backwards: id 1 is "Title 12", id 12 is "Title 01".
        let orderer = orderer();
        assert_eq!(
            orderer.order(vec![1, 999, 12, 6], "title", SortDirection::Asc),
            vec![12, 6, 1, 999]
        );
    }

    #[test]
    fn test_unknown_field_keeps_order() {
        let orderer = orderer();
        assert_eq!(
            orderer.order(vec![3, 1, 2], "colour", SortDirection::Asc),
            vec![3, 1, 2]
        );
    }
}
