//! Search and ordering for the catalog page.
//!
//! Always works on a copy; the catalog passed in is never reordered.

use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use classcart_core::{DomainError, DomainResult, Price};

use crate::item::CatalogItem;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Location,
    Price,
    /// Remaining spaces.
    Capacity,
}

impl FromStr for SortKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "subject" => Ok(SortKey::Name),
            "location" => Ok(SortKey::Location),
            "price" => Ok(SortKey::Price),
            "capacity" | "spaces" => Ok(SortKey::Capacity),
            other => Err(DomainError::UnknownSortKey(other.to_string())),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// What the catalog page is currently showing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub search: String,
    pub sort: Option<SortKey>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl CatalogQuery {
    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort = Some(key);
        self.direction = direction;
        self
    }

    /// Filter then sort a copy of `items`.
    ///
    /// Fails with `MalformedPrice` only when sorting by price and some item's
    /// price does not parse.
    pub fn apply(&self, items: &[CatalogItem]) -> DomainResult<Vec<CatalogItem>> {
        let needle = self.search.trim().to_lowercase();
        let mut view: Vec<CatalogItem> = items
            .iter()
            .filter(|item| matches_search(item, &needle))
            .cloned()
            .collect();

        let Some(key) = self.sort else {
            return Ok(view);
        };

        let direction = self.direction;
        match key {
            SortKey::Price => {
                let mut keyed = view
                    .into_iter()
                    .map(|item| item.price_value().map(|price| (price, item)))
                    .collect::<DomainResult<Vec<(Price, CatalogItem)>>>()?;
                keyed.sort_by(|(a, _), (b, _)| directed(a.cmp(b), direction));
                view = keyed.into_iter().map(|(_, item)| item).collect();
            }
            SortKey::Name => {
                view.sort_by(|a, b| directed(text_order(a.name(), b.name()), direction));
            }
            SortKey::Location => {
                view.sort_by(|a, b| {
                    directed(text_order(a.location(), b.location()), direction)
                });
            }
            SortKey::Capacity => {
                view.sort_by(|a, b| directed(a.remaining().cmp(&b.remaining()), direction));
            }
        }

        Ok(view)
    }
}

/// Case-insensitive substring search on name or location, then an optional
/// ascending sort.
pub fn filter_and_sort(
    items: &[CatalogItem],
    query: &str,
    sort: Option<SortKey>,
) -> DomainResult<Vec<CatalogItem>> {
    CatalogQuery {
        search: query.to_string(),
        sort,
        direction: SortDirection::Ascending,
    }
    .apply(items)
}

fn matches_search(item: &CatalogItem, needle: &str) -> bool {
    needle.is_empty()
        || item.name().to_lowercase().contains(needle)
        || item.location().to_lowercase().contains(needle)
}

// Accent- and case-folded first, then case-folded, then raw so the order is
// total.
fn text_order(a: &str, b: &str) -> Ordering {
    let (lower_a, lower_b) = (a.to_lowercase(), b.to_lowercase());
    fold_accents(&lower_a)
        .cmp(fold_accents(&lower_b))
        .then_with(|| lower_a.cmp(&lower_b))
        .then_with(|| a.cmp(b))
}

fn fold_accents(lower: &str) -> impl Iterator<Item = char> + '_ {
    lower.chars().map(base_letter)
}

/// Latin letter with its diacritic removed. Expects lowercase input.
fn base_letter(c: char) -> char {
    match c {
        'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è'..='ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ì'..='ï' | 'ī' | 'į' => 'i',
        'ł' => 'l',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò'..='ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ř' => 'r',
        'ś' | 'š' | 'ş' => 's',
        'ť' => 't',
        'ù'..='ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}
