//! Two-level category taxonomy.
//!
//! The taxonomy is read from a [`TaxonomySource`] the first time it is needed
//! and cached for the lifetime of the process.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SearchError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubCategory {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainCategory {
    pub id: u32,
    pub name: String,
    pub sub_categories: Vec<SubCategory>,
}

impl MainCategory {
    pub fn sub(&self, id: u32) -> Option<&SubCategory> {
        self.sub_categories.iter().find(|s| s.id == id)
    }
}

/// All categories keyed by main id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Taxonomy {
    mains: BTreeMap<u32, MainCategory>,
}

impl Taxonomy {
    pub fn new(mains: impl IntoIterator<Item = MainCategory>) -> Self {
        Self {
            mains: mains.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    pub fn mains(&self) -> impl Iterator<Item = &MainCategory> {
        self.mains.values()
    }

    pub fn main(&self, id: u32) -> Option<&MainCategory> {
        self.mains.get(&id)
    }

    pub fn sub(&self, main_id: u32, sub_id: u32) -> Option<(&MainCategory, &SubCategory)> {
        let main = self.mains.get(&main_id)?;
        main.sub(sub_id).map(|sub| (main, sub))
    }

    /// Human readable label for a record's category, "Main - Sub".
    ///
    /// Unknown pairs render as `???`.
    pub fn label(&self, main_id: u32, sub_id: u32) -> String {
        match self.sub(main_id, sub_id) {
            Some((main, sub)) => format!("{} - {}", main.name, sub.name),
            None => match self.main(main_id) {
                Some(main) if sub_id == 0 => main.name.clone(),
                _ => "???".to_string(),
            },
        }
    }

    /// Map of category keys to label lists, e.g.
    /// `"1_0" -> ["Anime"]`, `"1_2" -> ["Anime", "English-translated"]`.
    pub fn id_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map = BTreeMap::new();
        for main in self.mains.values() {
            map.insert(format!("{}_0", main.id), vec![main.name.clone()]);
            for sub in &main.sub_categories {
                map.insert(
                    format!("{}_{}", main.id, sub.id),
                    vec![main.name.clone(), sub.name.clone()],
                );
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.mains.is_empty()
    }
}

/// Where the taxonomy is loaded from.
pub trait TaxonomySource: Send + Sync {
    fn load_taxonomy(&self) -> Result<Taxonomy, SearchError>;
}

/// Build-once, read-many taxonomy cache.
///
/// A failed load leaves the cache empty so the next access retries.
pub struct CategoryTaxonomy {
    source: Option<Arc<dyn TaxonomySource>>,
    cell: OnceCell<Taxonomy>,
}

impl CategoryTaxonomy {
    pub fn new(source: Arc<dyn TaxonomySource>) -> Self {
        Self {
            source: Some(source),
            cell: OnceCell::new(),
        }
    }

    /// A cache that is already populated (no source needed).
    pub fn preloaded(taxonomy: Taxonomy) -> Self {
        Self {
            source: None,
            cell: OnceCell::with_value(taxonomy),
        }
    }

    pub fn get(&self) -> Result<&Taxonomy, SearchError> {
        self.cell.get_or_try_init(|| match &self.source {
            Some(source) => {
                let taxonomy = source.load_taxonomy()?;
                debug!(main_categories = taxonomy.mains.len(), "Category taxonomy loaded");
                Ok(taxonomy)
            }
            None => Ok(Taxonomy::default()),
        })
    }

    pub fn main_label(&self, main_id: u32) -> Result<Option<String>, SearchError> {
        Ok(self.get()?.main(main_id).map(|m| m.name.clone()))
    }

    pub fn sub_label(
        &self,
        main_id: u32,
        sub_id: u32,
    ) -> Result<Option<(String, String)>, SearchError> {
        Ok(self
            .get()?
            .sub(main_id, sub_id)
            .map(|(m, s)| (m.name.clone(), s.name.clone())))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn sample_taxonomy() -> Taxonomy {
        crate::testing::fixtures::taxonomy()
    }

    struct CountingSource {
        loads: AtomicUsize,
        fail_first: bool,
    }

    impl TaxonomySource for CountingSource {
        fn load_taxonomy(&self) -> Result<Taxonomy, SearchError> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(SearchError::Internal("db down".to_string()));
            }
            Ok(sample_taxonomy())
        }
    }

    #[test]
    fn test_lookup_main_and_sub() {
        let taxonomy = sample_taxonomy();
        assert_eq!(taxonomy.main(1).unwrap().name, "Anime");
        assert!(taxonomy.main(9).is_none());
        let (main, sub) = taxonomy.sub(1, 2).unwrap();
        assert_eq!(main.name, "Anime");
        assert_eq!(sub.name, "English-translated");
        assert!(taxonomy.sub(2, 2).is_none());
    }

    #[test]
    fn test_label() {
        let taxonomy = sample_taxonomy();
        assert_eq!(taxonomy.label(1, 2), "Anime - English-translated");
        assert_eq!(taxonomy.label(2, 0), "Audio");
        assert_eq!(taxonomy.label(5, 5), "???");
    }

    #[test]
    fn test_id_map() {
        let map = sample_taxonomy().id_map();
        assert_eq!(map.get("1_0").unwrap(), &vec!["Anime".to_string()]);
        assert_eq!(
            map.get("1_2").unwrap(),
            &vec!["Anime".to_string(), "English-translated".to_string()]
        );
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn test_cache_loads_once() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            fail_first: false,
        });
        let cache = CategoryTaxonomy::new(source.clone());

        assert_eq!(cache.main_label(1).unwrap().as_deref(), Some("Anime"));
        assert!(cache.sub_label(1, 2).unwrap().is_some());
        assert!(cache.sub_label(1, 9).unwrap().is_none());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_retried() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            fail_first: true,
        });
        let cache = CategoryTaxonomy::new(source.clone());

        assert!(cache.get().is_err());
        assert!(cache.get().is_ok());
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_reads_share_one_value() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            fail_first: false,
        });
        let cache = Arc::new(CategoryTaxonomy::new(source.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.main_label(2).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().as_deref(), Some("Audio"));
        }
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }
}
