use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::storage::Store;
use crate::trending::{Country, TrendingCategory};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FavoriteSection {
    Trending { country: String, category: String },
}

impl FavoriteSection {
    pub fn trending(country: Country, category: TrendingCategory) -> Self {
        FavoriteSection::Trending {
            country: country.code().to_string(),
            category: category.raw_value().to_string(),
        }
    }

    pub fn stable_id(&self) -> String {
        match self {
            FavoriteSection::Trending { country, category } => {
                format!("trending-{country}-{category}")
            }
        }
    }

    pub fn trending_selection(&self) -> Option<(Country, TrendingCategory)> {
        match self {
            FavoriteSection::Trending { country, category } => Some((
                Country::from_code(country)?,
                TrendingCategory::from_raw(category)?,
            )),
        }
    }

    pub fn label(&self) -> String {
        match self.trending_selection() {
            Some((country, category)) => {
                format!("Trending · {} {} · {}", country.flag(), country.name(), category.name())
            }
            None => self.stable_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FavoriteItem {
    pub id: String,
    pub section: FavoriteSection,
}

impl FavoriteItem {
    pub fn new(section: FavoriteSection) -> Self {
        Self {
            id: section.stable_id(),
            section,
        }
    }
}

pub struct Favorites {
    store: Arc<Store>,
}

impl Favorites {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn is_favorite(&self, item: &FavoriteItem) -> bool {
        match self.store.has_favorite(&item.id) {
            Ok(found) => found,
            Err(err) => {
                log::warn!("favorites: lookup {} failed: {err:#}", item.id);
                false
            }
        }
    }

    pub fn toggle(&self, item: &FavoriteItem) -> Result<bool> {
        if self.store.has_favorite(&item.id)? {
            self.store.remove_favorite(&item.id)?;
            return Ok(false);
        }
        let section =
            serde_json::to_string(&item.section).context("favorites: encode section")?;
        self.store.add_favorite(&item.id, &section)?;
        Ok(true)
    }

    pub fn list(&self) -> Result<Vec<FavoriteItem>> {
        let rows = self.store.list_favorites()?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<FavoriteSection>(&row.section) {
                Ok(section) => items.push(FavoriteItem { id: row.id, section }),
                Err(err) => log::warn!("favorites: skipping {}: {err}", row.id),
            }
        }
        Ok(items)
    }
}
