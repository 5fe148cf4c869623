//! `Repository` implementation over the SQLite database.

use crate::database::Database;
use slidebank_core::{
    AiUsageRecord, Presentation, PresentationId, PresentationUpdate, Repository, Result, Slide,
};

impl Repository for Database {
    fn find_by_checksum(&self, checksum: &str) -> Result<Option<Presentation>> {
        Ok(self.find_presentation_by_checksum(checksum)?)
    }

    fn find_by_identity(&self, filename: &str, canonical_path: &str) -> Result<Option<Presentation>> {
        Ok(self.find_presentation_by_identity(filename, canonical_path)?)
    }

    fn create_presentation(&self, presentation: &Presentation) -> Result<PresentationId> {
        Ok(Database::create_presentation(self, presentation)?)
    }

    fn update_presentation(&self, id: &str, update: &PresentationUpdate) -> Result<()> {
        Ok(Database::update_presentation(self, id, update)?)
    }

    fn delete_slides(&self, presentation_id: &str) -> Result<usize> {
        Ok(Database::delete_slides(self, presentation_id)?)
    }

    fn insert_slide(&self, slide: &Slide) -> Result<()> {
        Ok(Database::insert_slide(self, slide)?)
    }

    fn get_feature_flag(&self, name: &str) -> Result<Option<String>> {
        Ok(Database::get_feature_flag(self, name)?)
    }

    fn set_feature_flag(&self, name: &str, value: &str) -> Result<()> {
        Ok(Database::set_feature_flag(self, name, value)?)
    }

    fn log_ai_usage(&self, usage: &AiUsageRecord) -> Result<()> {
        Ok(Database::log_ai_usage(self, usage)?)
    }

    fn clear_all(&self) -> Result<()> {
        Database::clear_all(self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_repository_through_trait_object() {
        let repo: Arc<dyn Repository> = Arc::new(Database::open_in_memory().unwrap());

        let p = Presentation::new("deck.pptx", "stage/deck.pptx", "h1");
        let id = repo.create_presentation(&p).unwrap();
        repo.insert_slide(&Slide::new(&id, 1)).unwrap();
        repo.insert_slide(&Slide::new(&id, 2)).unwrap();

        assert!(repo.find_by_checksum("h1").unwrap().is_some());
        assert!(repo
            .find_by_identity("deck.pptx", "stage/deck.pptx")
            .unwrap()
            .is_some());
        assert_eq!(repo.delete_slides(&id).unwrap(), 2);

        repo.clear_all().unwrap();
        assert!(repo.find_by_checksum("h1").unwrap().is_none());
    }

    #[test]
    fn test_not_found_maps_to_core_error() {
        let repo: Arc<dyn Repository> = Arc::new(Database::open_in_memory().unwrap());
        let err = repo
            .update_presentation("missing", &PresentationUpdate::title("x"))
            .unwrap_err();
        assert!(matches!(err, slidebank_core::Error::NotFound(_)));
    }
}
