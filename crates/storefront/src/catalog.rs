//! Product listing: concurrent load plus pure filtering and sorting.

use std::str::FromStr;

use tracing::{info, instrument};

use crate::api::{ApiError, CatalogGateway, Product};
use crate::scope::FlowScope;

/// Category value that disables category filtering.
pub const ALL_CATEGORIES: &str = "all";

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// By name, case- and accent-insensitive.
    #[default]
    Name,
    /// Cheapest first.
    PriceLow,
    /// Most expensive first.
    PriceHigh,
}

impl SortKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            _ => Err(format!(
                "invalid sort '{s}' (expected name, price-low or price-high)"
            )),
        }
    }
}

/// What the user is looking for in the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub search: String,
    pub category: String,
    pub sort: SortKey,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: ALL_CATEGORIES.to_string(),
            sort: SortKey::default(),
        }
    }
}

/// Products and categories fetched for one listing view.
#[derive(Debug, Clone, Default)]
pub struct ProductListing {
    products: Vec<Product>,
    categories: Vec<String>,
}

impl ProductListing {
    /// Fetch products and categories concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first failure of either fetch, or `ApiError::Cancelled`
    /// if `scope` is aborted first.
    #[instrument(skip_all, fields(scope = scope.name()))]
    pub async fn load<G: CatalogGateway>(gateway: &G, scope: &FlowScope) -> Result<Self, ApiError> {
        let (products, categories) =
            futures::try_join!(scope.run(gateway.products()), scope.run(gateway.categories()))?;

        info!(
            products = products.len(),
            categories = categories.len(),
            "Product listing loaded"
        );
        Ok(Self::new(products, categories))
    }

    /// Build a listing from already fetched data. `all` is put in front of
    /// the categories.
    #[must_use]
    pub fn new(products: Vec<Product>, categories: Vec<String>) -> Self {
        let categories = std::iter::once(ALL_CATEGORIES.to_string())
            .chain(
                categories
                    .into_iter()
                    .filter(|c| !c.eq_ignore_ascii_case(ALL_CATEGORIES)),
            )
            .collect();
        Self {
            products,
            categories,
        }
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Categories, starting with `all`.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Products matching `query`, in its order.
    #[must_use]
    pub fn view(&self, query: &ListingQuery) -> Vec<&Product> {
        filtered_and_sorted(&self.products, &query.search, &query.category, query.sort)
    }
}

/// Filter and sort `products` without touching the source list.
///
/// A non-empty `search` keeps products whose name, description or category
/// contains it as typed, surrounding whitespace included (case-insensitive). A `category` other than `all` keeps exact
/// case-insensitive matches. Sorting is stable.
#[must_use]
pub fn filtered_and_sorted<'a>(
    products: &'a [Product],
    search: &str,
    category: &str,
    sort: SortKey,
) -> Vec<&'a Product> {
    let needle = search.to_lowercase();
    let category = category.trim();

    let mut matches: Vec<&Product> = products
        .iter()
        .filter(|product| needle.is_empty() || matches_search(product, &needle))
        .filter(|product| {
            category.is_empty()
                || category.eq_ignore_ascii_case(ALL_CATEGORIES)
                || product
                    .category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase() == category.to_lowercase())
        })
        .collect();

    match sort {
        SortKey::Name => matches.sort_by_cached_key(|product| collation_key(&product.name)),
        SortKey::PriceLow => matches.sort_by(|a, b| a.price.cmp(&b.price)),
        SortKey::PriceHigh => matches.sort_by(|a, b| b.price.cmp(&a.price)),
    }
    matches
}

fn matches_search(product: &Product, needle: &str) -> bool {
    product.name.to_lowercase().contains(needle)
        || product.description.to_lowercase().contains(needle)
        || product
            .category
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(needle))
}

/// Primary sort key for names: lowercase with Latin accents folded.
fn collation_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .collect()
}

const fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
