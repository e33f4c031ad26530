//! Static reference data the storefront starts from.

use classcart_core::ItemId;

use crate::item::{Catalog, CatalogItem};

/// Spaces every class opens with.
pub const DEFAULT_CAPACITY: u32 = 5;

const CLASSES: &[(u32, &str, &str, &str)] = &[
    (1, "Python Programming", "Liverpool", "£150"),
    (2, "Cybersecurity Basics", "Bristol", "£250"),
    (3, "Web Development", "London", "£180"),
    (4, "Data Science with R", "Manchester", "£220"),
    (5, "Digital Photography", "Brighton", "£95"),
    (6, "Creative Writing", "Oxford", "£88.99"),
    (7, "Spanish for Beginners", "Leeds", "£120"),
    (8, "Pottery Workshop", "Bath", "£75.50"),
    (9, "Public Speaking", "Birmingham", "£110"),
    (10, "Machine Learning Fundamentals", "Cambridge", "£299.99"),
];

/// The catalog as it looks when the process starts.
pub fn seed_catalog() -> Catalog {
    let items = CLASSES
        .iter()
        .map(|&(id, name, location, price)| {
            CatalogItem::new(ItemId::new(id), name, location, price, DEFAULT_CAPACITY)
        })
        .collect();
    Catalog::from_items_unchecked(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_ids_are_unique_and_prices_parse() {
        let catalog = seed_catalog();
        assert_eq!(catalog.len(), CLASSES.len());
        assert!(Catalog::new(catalog.items().to_vec()).is_ok());
        for item in catalog.iter() {
            assert!(item.price_value().is_ok(), "bad seed price {}", item.price());
            assert_eq!(item.remaining(), DEFAULT_CAPACITY);
            assert!(!item.in_cart());
        }
    }
}
