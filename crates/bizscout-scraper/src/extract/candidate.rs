use bizscout_core::{BusinessRecord, ExtractionMethod};
use reqwest::Url;

use crate::error::ValidationError;

/// A listing as seen by one sub-extractor, before filtering and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionCandidate {
    pub title: Option<String>,
    pub listing_url: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub business_type: Option<String>,
    pub status: Option<String>,
    pub images: Vec<String>,
    pub contact_info: Option<String>,
    pub financial_info: Option<String>,
    pub features: Option<String>,
    pub additional_details: Option<String>,
    pub all_links: Vec<String>,
    pub raw_text: Option<String>,
    pub raw_html: Option<String>,
    pub listing_index: Option<usize>,
    pub extraction_method: ExtractionMethod,
}

impl ExtractionCandidate {
    /// An empty candidate tagged with its source.
    #[must_use]
    pub fn new(extraction_method: ExtractionMethod) -> Self {
        Self {
            title: None,
            listing_url: None,
            location: None,
            price: None,
            description: None,
            business_type: None,
            status: None,
            images: Vec::new(),
            contact_info: None,
            financial_info: None,
            features: None,
            additional_details: None,
            all_links: Vec::new(),
            raw_text: None,
            raw_html: None,
            listing_index: None,
            extraction_method,
        }
    }

    /// Converts a filtered candidate into a record.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the title or listing URL is missing,
    /// or the listing URL is not an absolute `http`/`https` URL.
    pub fn into_record(self) -> Result<BusinessRecord, ValidationError> {
        let title = self.title.ok_or(ValidationError::MissingTitle)?;
        let listing_url = self.listing_url.ok_or(ValidationError::MissingListingUrl)?;
        match Url::parse(&listing_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => return Err(ValidationError::InvalidListingUrl(listing_url)),
        }

        Ok(BusinessRecord {
            title,
            listing_url,
            location: self.location,
            price: self.price,
            description: self.description,
            business_type: self.business_type,
            status: self.status,
            images: self.images,
            contact_info: self.contact_info,
            financial_info: self.financial_info,
            features: self.features,
            additional_details: self.additional_details,
            all_links: self.all_links,
            raw_text: self.raw_text,
            raw_html: self.raw_html,
            listing_index: self.listing_index,
            extraction_method: self.extraction_method,
            modified_at: None,
            modified_by: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: Option<&str>, url: Option<&str>) -> ExtractionCandidate {
        ExtractionCandidate {
            title: title.map(str::to_string),
            listing_url: url.map(str::to_string),
            listing_index: Some(3),
            ..ExtractionCandidate::new(ExtractionMethod::Heuristic)
        }
    }

    #[test]
    fn valid_candidate_becomes_record() {
        let record = candidate(Some("Coastal Surf School"), Some("https://example.com/l/9"))
            .into_record()
            .unwrap();
        assert_eq!(record.title, "Coastal Surf School");
        assert_eq!(record.listing_index, Some(3));
        assert_eq!(record.extraction_method, ExtractionMethod::Heuristic);
        assert!(record.modified_at.is_none());
    }

    #[test]
    fn missing_title_is_rejected() {
        assert_eq!(
            candidate(None, Some("https://example.com/l/9")).into_record(),
            Err(ValidationError::MissingTitle)
        );
    }

    #[test]
    fn missing_url_is_rejected() {
        assert_eq!(
            candidate(Some("Coastal Surf School"), None).into_record(),
            Err(ValidationError::MissingListingUrl)
        );
    }

    #[test]
    fn relative_or_non_http_url_is_rejected() {
        assert!(matches!(
            candidate(Some("Coastal Surf School"), Some("/l/9")).into_record(),
            Err(ValidationError::InvalidListingUrl(_))
        ));
        assert!(matches!(
            candidate(Some("Coastal Surf School"), Some("mailto:sales@example.com")).into_record(),
            Err(ValidationError::InvalidListingUrl(_))
        ));
    }
}
