use crate::domain::model::Strain;
use crate::domain::ports::Storage;
use crate::utils::error::{HydroError, Result};
use crate::utils::validation::validate_non_empty_string;

/// Categories offered when the remote strain service cannot be reached.
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "Flavor Focused",
    "High THC",
    "Medical",
    "Balanced Hybrid",
    "Autoflower",
    "High Yield",
];

pub fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

/// Locally persisted strain profiles, stored as a JSON array.
pub struct StrainDatabase<S: Storage> {
    storage: S,
    file: String,
    strains: Vec<Strain>,
}

impl<S: Storage> StrainDatabase<S> {
    /// Loads the database, creating an empty one if the file does not exist yet.
    pub async fn open(storage: S, file: impl Into<String>) -> Result<Self> {
        let file = file.into();

        if !storage.exists(&file).await {
            tracing::info!("🌱 Creating empty strain database at {}", file);
            storage.write_file(&file, b"[]").await?;
            return Ok(Self {
                storage,
                file,
                strains: Vec::new(),
            });
        }

        let bytes = storage.read_file(&file).await?;
        let strains: Vec<Strain> = if bytes.iter().all(u8::is_ascii_whitespace) {
            Vec::new()
        } else {
            serde_json::from_slice(&bytes)?
        };
        tracing::debug!("Loaded {} strains from {}", strains.len(), file);

        Ok(Self {
            storage,
            file,
            strains,
        })
    }

    pub fn list(&self) -> &[Strain] {
        &self.strains
    }

    pub fn len(&self) -> usize {
        self.strains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strains.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Strain> {
        self.strains
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn require(&self, name: &str) -> Result<&Strain> {
        self.get(name)
            .ok_or_else(|| HydroError::not_found("strain", name))
    }

    /// Inserts or replaces a strain by name. Returns true when an entry was replaced.
    pub async fn upsert(&mut self, mut strain: Strain) -> Result<bool> {
        strain.name = strain.name.trim().to_string();
        validate_non_empty_string("strain name", &strain.name)?;
        let ec_ok = strain
            .ec_range
            .is_none_or(|r| r.is_well_formed() && r.min >= 0.0);
        let ph_ok = strain
            .ph_range
            .is_none_or(|r| r.is_well_formed() && r.min >= 0.0 && r.max <= 14.0);
        if !ec_ok || !ph_ok {
            return Err(HydroError::validation(format!(
                "Strain '{}' has invalid EC/pH ranges",
                strain.name
            )));
        }

        let mut next = self.strains.clone();
        let replaced = match next
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(&strain.name))
        {
            Some(existing) => {
                *existing = strain;
                true
            }
            None => {
                next.push(strain);
                false
            }
        };

        self.commit(next).await?;
        Ok(replaced)
    }

    pub async fn remove(&mut self, name: &str) -> Result<bool> {
        if self.get(name).is_none() {
            return Ok(false);
        }
        let mut next = self.strains.clone();
        next.retain(|s| !s.name.eq_ignore_ascii_case(name.trim()));
        self.commit(next).await?;
        Ok(true)
    }

    /// Case-insensitive substring match on name, category and tags.
    pub fn search(&self, query: &str) -> Vec<&Strain> {
        let query = query.trim().to_lowercase();
        self.strains
            .iter()
            .filter(|s| {
                query.is_empty()
                    || s.name.to_lowercase().contains(&query)
                    || s
                        .category
                        .as_deref()
                        .is_some_and(|c| c.to_lowercase().contains(&query))
                    || s.tags.iter().any(|t| t.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Sorted, de-duplicated categories of the stored strains.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .strains
            .iter()
            .filter_map(|s| s.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    async fn commit(&mut self, next: Vec<Strain>) -> Result<()> {
        let json = serde_json::to_vec_pretty(&next)?;
        self.storage.write_file(&self.file, &json).await?;
        self.strains = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::memory::MemoryStorage;
    use crate::domain::model::{FeedingType, Range};

    fn strain(name: &str, category: &str) -> Strain {
        let mut s = Strain::new(name);
        s.category = Some(category.to_string());
        s
    }

    #[tokio::test]
    async fn test_open_creates_empty_file() {
        let storage = MemoryStorage::new();
        let db = StrainDatabase::open(storage.clone(), "strains.json")
            .await
            .unwrap();
        assert!(db.is_empty());
        assert_eq!(storage.get_file("strains.json").await.unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_upsert_persists_and_reloads() {
        let storage = MemoryStorage::new();
        let mut db = StrainDatabase::open(storage.clone(), "strains.json")
            .await
            .unwrap();

        let mut og = strain("OG Kush", "High THC");
        og.feeding_type = FeedingType::Heavy;
        og.ec_range = Some(Range::new(1.4, 2.0));
        assert!(!db.upsert(og).await.unwrap());
        assert!(db.upsert(strain("og kush", "Medical")).await.unwrap());
        assert_eq!(db.len(), 1);

        let reloaded = StrainDatabase::open(storage, "strains.json").await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.get("OG KUSH").unwrap().category.as_deref(),
            Some("Medical")
        );
    }

    #[tokio::test]
    async fn test_upsert_rejects_malformed_ranges() {
        let storage = MemoryStorage::new();
        let mut db = StrainDatabase::open(storage, "strains.json").await.unwrap();

        let mut inverted = strain("Big Bud", "High Yield");
        inverted.ec_range = Some(Range::new(2.0, 1.0));
        assert!(matches!(
            db.upsert(inverted).await,
            Err(HydroError::ValidationError { .. })
        ));

        let mut nan_ph = strain("Big Bud", "High Yield");
        nan_ph.ph_range = Some(Range::new(f64::NAN, 6.5));
        assert!(db.upsert(nan_ph).await.is_err());

        let mut alkaline = strain("Big Bud", "High Yield");
        alkaline.ph_range = Some(Range::new(6.0, 14.5));
        assert!(db.upsert(alkaline).await.is_err());
        assert!(db.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_trims_name() {
        let storage = MemoryStorage::new();
        let mut db = StrainDatabase::open(storage, "strains.json").await.unwrap();
        db.upsert(strain(" OG Kush ", "High THC")).await.unwrap();

        assert_eq!(db.list()[0].name, "OG Kush");
        assert!(db.get("og kush").is_some());
        assert!(db.upsert(strain("OG Kush", "Medical")).await.unwrap());
        assert_eq!(db.len(), 1);
        assert!(db.remove(" og kush").await.unwrap());
        assert!(db.upsert(strain("   ", "Medical")).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_strains() {
        let storage = MemoryStorage::new();
        let mut db = StrainDatabase::open(storage.clone(), "strains.json")
            .await
            .unwrap();
        db.upsert(strain("Blue Dream", "Balanced Hybrid")).await.unwrap();
        storage.set_read_only(true);

        assert!(db.upsert(strain("Northern Lights", "Autoflower")).await.is_err());
        assert!(db.get("Northern Lights").is_none());
        assert!(db.upsert(strain("Blue Dream", "Medical")).await.is_err());
        assert_eq!(
            db.get("Blue Dream").unwrap().category.as_deref(),
            Some("Balanced Hybrid")
        );
        assert!(db.remove("Blue Dream").await.is_err());
        assert_eq!(db.len(), 1);
    }

    #[tokio::test]
    async fn test_search_and_categories() {
        let storage = MemoryStorage::new();
        let mut db = StrainDatabase::open(storage, "strains.json").await.unwrap();
        db.upsert(strain("Blue Dream", "Balanced Hybrid")).await.unwrap();
        db.upsert(strain("Northern Lights", "Autoflower")).await.unwrap();
        let mut cbd = strain("ACDC", "Medical");
        cbd.tags = vec!["cbd".to_string()];
        db.upsert(cbd).await.unwrap();

        assert_eq!(db.search("dream").len(), 1);
        assert_eq!(db.search("AUTO")[0].name, "Northern Lights");
        assert_eq!(db.search("cbd")[0].name, "ACDC");
        assert_eq!(db.search("").len(), 3);
        assert_eq!(
            db.categories(),
            vec!["Autoflower", "Balanced Hybrid", "Medical"]
        );
    }

    #[tokio::test]
    async fn test_remove_and_require() {
        let storage = MemoryStorage::new();
        let mut db = StrainDatabase::open(storage, "strains.json").await.unwrap();
        db.upsert(strain("Blue Dream", "Balanced Hybrid")).await.unwrap();
        assert!(db.remove("blue dream").await.unwrap());
        assert!(!db.remove("blue dream").await.unwrap());
        assert!(matches!(
            db.require("Blue Dream"),
            Err(HydroError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let storage = MemoryStorage::new();
        let mut db = StrainDatabase::open(storage, "strains.json").await.unwrap();
        assert!(db.upsert(Strain::new("  ")).await.is_err());
    }
}
