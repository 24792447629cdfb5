//! The capture form: location, address, photos, save.
//!
//! A capture is assembled in a [`DraftSession`] owned by the caller. The
//! [`CaptureController`] fills in the position fix and address, then turns
//! the draft into a stored [`Entry`]. Every operation takes the draft by
//! `&mut`, so two location or address requests can never race on the same
//! draft. A failed step leaves the draft exactly as it was.

mod location;

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::entry::{normalize_address, Coordinates, Entry};
use crate::error::{Error, Result};
use crate::geocode::Geocoder;
use crate::photo::PhotoNormalizer;
use crate::storage::Storage;

pub use location::{
    FixedLocation, GpsdLocation, LocationProvider, LocationRequest, NoLocationSource,
};

/// Progress of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    /// No position fix yet.
    Idle,
    /// A fix is present but no address.
    LocationAcquired,
    /// A fix and its resolved address are present.
    AddressResolved,
}

impl std::fmt::Display for DraftState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::LocationAcquired => write!(f, "location acquired"),
            Self::AddressResolved => write!(f, "address resolved"),
        }
    }
}

/// An in-progress capture.
///
/// The address is only ever set for the current coordinates: acquiring a new
/// fix drops it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftSession {
    /// Free-text memo.
    pub memo: String,
    /// Free-text tags.
    pub tags: String,
    /// Visited flag.
    pub visited: bool,
    /// Image files selected for the entry.
    pub photo_paths: Vec<PathBuf>,
    coordinates: Option<Coordinates>,
    address: Option<String>,
}

impl DraftSession {
    /// Start a draft with the given text fields.
    #[must_use]
    pub fn new(memo: impl Into<String>, tags: impl Into<String>, visited: bool) -> Self {
        Self {
            memo: memo.into(),
            tags: tags.into(),
            visited,
            ..Self::default()
        }
    }

    /// Add image files to the draft.
    #[must_use]
    pub fn with_photo_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.photo_paths = paths;
        self
    }

    /// The current position fix.
    #[must_use]
    pub fn coordinates(&self) -> Option<&Coordinates> {
        self.coordinates.as_ref()
    }

    /// The resolved address.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Where the draft stands.
    #[must_use]
    pub fn state(&self) -> DraftState {
        match (&self.coordinates, &self.address) {
            (None, _) => DraftState::Idle,
            (Some(_), None) => DraftState::LocationAcquired,
            (Some(_), Some(_)) => DraftState::AddressResolved,
        }
    }
}

/// Rules checked when a draft is saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavePolicy {
    /// Refuse to save a draft with no usable photo.
    pub require_photo: bool,
}

/// Drives a draft through location, address and save.
pub struct CaptureController<'a> {
    storage: &'a Storage,
    locator: &'a dyn LocationProvider,
    geocoder: &'a dyn Geocoder,
    request: LocationRequest,
    normalizer: PhotoNormalizer,
    policy: SavePolicy,
}

impl std::fmt::Debug for CaptureController<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("storage", &self.storage.path())
            .field("locator", &self.locator.name())
            .field("request", &self.request)
            .field("normalizer", &self.normalizer)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<'a> CaptureController<'a> {
    /// Create a controller with default request, normalizer and policy.
    #[must_use]
    pub fn new(
        storage: &'a Storage,
        locator: &'a dyn LocationProvider,
        geocoder: &'a dyn Geocoder,
    ) -> Self {
        Self {
            storage,
            locator,
            geocoder,
            request: LocationRequest::default(),
            normalizer: PhotoNormalizer::default(),
            policy: SavePolicy::default(),
        }
    }

    /// Use `request` for location lookups.
    #[must_use]
    pub fn with_location_request(mut self, request: LocationRequest) -> Self {
        self.request = request;
        self
    }

    /// Use `normalizer` for photos.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: PhotoNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Use `policy` when saving.
    #[must_use]
    pub fn with_policy(mut self, policy: SavePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Obtain a position fix for the draft.
    ///
    /// Any address resolved for earlier coordinates is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationUnavailable`] or [`Error::PermissionDenied`];
    /// the draft is unchanged on error.
    pub async fn acquire_location(&self, draft: &mut DraftSession) -> Result<Coordinates> {
        debug!("Acquiring location via {}", self.locator.name());
        let fix = self.locator.current_position(&self.request).await?;
        let coords = Coordinates::new(fix.latitude, fix.longitude, fix.accuracy_m);

        draft.coordinates = Some(coords);
        draft.address = None;
        info!("Location acquired: {}", coords);
        Ok(coords)
    }

    /// Resolve the draft's coordinates to an address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoLocation`] if the draft has no fix, or the
    /// geocoder's error; the draft is unchanged on error.
    pub async fn resolve_address(&self, draft: &mut DraftSession) -> Result<String> {
        let coords = draft.coordinates.ok_or(Error::NoLocation)?;

        let address = self
            .geocoder
            .resolve(coords.latitude, coords.longitude)
            .await?;
        let address = normalize_address(Some(address))
            .ok_or_else(|| Error::remote("ZERO_RESULTS", "provider returned an empty address"))?;

        draft.address = Some(address.clone());
        info!("Address resolved: {}", address);
        Ok(address)
    }

    /// Normalize photos, store the draft as a new entry and reset the draft.
    ///
    /// Returns the new entry's id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PhotoRequired`] when the policy demands a photo and
    /// none survived normalization, or a storage error. The draft is kept on
    /// error.
    pub async fn save(&self, draft: &mut DraftSession) -> Result<i64> {
        let normalizer = self.normalizer;
        let paths = draft.photo_paths.clone();
        let requested = paths.len();

        let photos = tokio::task::spawn_blocking(move || normalizer.normalize_owned(paths))
            .await
            .map_err(|e| Error::internal(format!("photo normalization task failed: {e}")))?;

        if photos.len() < requested {
            warn!(
                "{} of {} selected photos were skipped",
                requested - photos.len(),
                requested
            );
        }
        if self.policy.require_photo && photos.is_empty() {
            return Err(Error::PhotoRequired);
        }

        let entry = Entry::new(draft.memo.clone(), draft.tags.clone(), draft.visited)
            .with_coordinates(draft.coordinates)
            .with_address(draft.address.clone())
            .with_photos(photos);
        let id = self.storage.insert(&entry)?;

        *draft = DraftSession::default();
        info!("Saved entry {}", id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubLocator(Result<Coordinates>);

    #[async_trait]
    impl LocationProvider for StubLocator {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn current_position(&self, _request: &LocationRequest) -> Result<Coordinates> {
            match &self.0 {
                Ok(coords) => Ok(*coords),
                Err(Error::PermissionDenied { message }) => {
                    Err(Error::permission_denied(message.clone()))
                }
                Err(e) => Err(Error::location_unavailable(e.to_string())),
            }
        }
    }

    /// Geocoder answering "addr-N" on the Nth call, or failing when keyless.
    #[derive(Default)]
    struct StubGeocoder {
        keyless: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn resolve(&self, _latitude: f64, _longitude: f64) -> Result<String> {
            if self.keyless {
                return Err(Error::MissingCredential);
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("addr-{n}"))
        }
    }

    fn here() -> StubLocator {
        StubLocator(Ok(Coordinates::new(35.681_236_7, 139.767_125_2, 12.4)))
    }

    #[tokio::test]
    async fn test_acquire_location_rounds_and_advances_state() {
        let storage = Storage::open_in_memory().unwrap();
        let locator = here();
        let geocoder = StubGeocoder::default();
        let controller = CaptureController::new(&storage, &locator, &geocoder);

        let mut draft = DraftSession::new("memo", "", false);
        assert_eq!(draft.state(), DraftState::Idle);

        let coords = controller.acquire_location(&mut draft).await.unwrap();
        assert!((coords.latitude - 35.681_237).abs() < 1e-9);
        assert!((coords.accuracy_m - 12.0).abs() < f64::EPSILON);
        assert_eq!(draft.state(), DraftState::LocationAcquired);
    }

    #[tokio::test]
    async fn test_location_failure_leaves_draft_untouched() {
        let storage = Storage::open_in_memory().unwrap();
        let locator = StubLocator(Err(Error::permission_denied("user refused")));
        let geocoder = StubGeocoder::default();
        let controller = CaptureController::new(&storage, &locator, &geocoder);

        let mut draft = DraftSession::new("memo", "tag", true);
        let before = draft.clone();
        let err = controller.acquire_location(&mut draft).await.unwrap_err();

        assert!(matches!(err, Error::PermissionDenied { .. }));
        assert_eq!(draft, before);
    }

    #[tokio::test]
    async fn test_resolve_address_requires_location() {
        let storage = Storage::open_in_memory().unwrap();
        let locator = here();
        let geocoder = StubGeocoder::default();
        let controller = CaptureController::new(&storage, &locator, &geocoder);

        let mut draft = DraftSession::default();
        let err = controller.resolve_address(&mut draft).await.unwrap_err();
        assert!(matches!(err, Error::NoLocation));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_address_then_reacquire_clears_it() {
        let storage = Storage::open_in_memory().unwrap();
        let locator = here();
        let geocoder = StubGeocoder::default();
        let controller = CaptureController::new(&storage, &locator, &geocoder);

        let mut draft = DraftSession::default();
        controller.acquire_location(&mut draft).await.unwrap();
        let address = controller.resolve_address(&mut draft).await.unwrap();
        assert_eq!(address, "addr-1");
        assert_eq!(draft.state(), DraftState::AddressResolved);

        controller.acquire_location(&mut draft).await.unwrap();
        assert_eq!(draft.state(), DraftState::LocationAcquired);
        assert!(draft.address().is_none());
    }

    #[tokio::test]
    async fn test_missing_credential_leaves_address_empty() {
        let storage = Storage::open_in_memory().unwrap();
        let locator = here();
        let geocoder = StubGeocoder {
            keyless: true,
            ..StubGeocoder::default()
        };
        let controller = CaptureController::new(&storage, &locator, &geocoder);

        let mut draft = DraftSession::default();
        controller.acquire_location(&mut draft).await.unwrap();
        let err = controller.resolve_address(&mut draft).await.unwrap_err();

        assert!(matches!(err, Error::MissingCredential));
        assert!(draft.address().is_none());
        assert_eq!(draft.state(), DraftState::LocationAcquired);
    }

    #[tokio::test]
    async fn test_missing_credential_keeps_previous_address() {
        let storage = Storage::open_in_memory().unwrap();
        let locator = here();
        let working = StubGeocoder::default();
        let keyless = StubGeocoder {
            keyless: true,
            ..StubGeocoder::default()
        };

        let mut draft = DraftSession::default();
        let controller = CaptureController::new(&storage, &locator, &working);
        controller.acquire_location(&mut draft).await.unwrap();
        let previous = controller.resolve_address(&mut draft).await.unwrap();

        let controller = CaptureController::new(&storage, &locator, &keyless);
        let err = controller.resolve_address(&mut draft).await.unwrap_err();

        assert!(matches!(err, Error::MissingCredential));
        assert_eq!(draft.address(), Some(previous.as_str()));
        assert_eq!(draft.state(), DraftState::AddressResolved);
    }

    #[tokio::test]
    async fn test_save_stores_entry_and_resets_draft() {
        crate::logging::init_test_logging();
        let storage = Storage::open_in_memory().unwrap();
        let locator = here();
        let geocoder = StubGeocoder::default();
        let controller = CaptureController::new(&storage, &locator, &geocoder);

        let mut draft = DraftSession::new("vacant lot", "corner", true);
        controller.acquire_location(&mut draft).await.unwrap();
        controller.resolve_address(&mut draft).await.unwrap();

        let id = controller.save(&mut draft).await.unwrap();
        assert_eq!(draft, DraftSession::default());

        let stored = storage.get(id).unwrap().unwrap();
        assert_eq!(stored.memo, "vacant lot");
        assert_eq!(stored.tags, "corner");
        assert!(stored.visited);
        assert_eq!(stored.address.as_deref(), Some("addr-1"));
        assert!(stored.coordinates.is_some());
        assert!(stored.photos.is_empty());
    }

    #[tokio::test]
    async fn test_save_without_location() {
        let storage = Storage::open_in_memory().unwrap();
        let locator = here();
        let geocoder = StubGeocoder::default();
        let controller = CaptureController::new(&storage, &locator, &geocoder);

        let mut draft = DraftSession::new("just a note", "", false);
        let id = controller.save(&mut draft).await.unwrap();

        let stored = storage.get(id).unwrap().unwrap();
        assert!(stored.coordinates.is_none());
        assert!(stored.address.is_none());
    }

    #[tokio::test]
    async fn test_photo_required_policy_keeps_draft() {
        let storage = Storage::open_in_memory().unwrap();
        let locator = here();
        let geocoder = StubGeocoder::default();
        let controller = CaptureController::new(&storage, &locator, &geocoder)
            .with_policy(SavePolicy { require_photo: true });

        let mut draft = DraftSession::new("memo", "", false)
            .with_photo_paths(vec![PathBuf::from("/nonexistent/photo.jpg")]);
        let before = draft.clone();

        let err = controller.save(&mut draft).await.unwrap_err();
        assert!(matches!(err, Error::PhotoRequired));
        assert_eq!(draft, before);
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_normalizes_photos() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.png");
        image::RgbImage::new(64, 32).save(&path).unwrap();

        let storage = Storage::open_in_memory().unwrap();
        let locator = here();
        let geocoder = StubGeocoder::default();
        let controller = CaptureController::new(&storage, &locator, &geocoder)
            .with_policy(SavePolicy { require_photo: true });

        let mut draft = DraftSession::new("", "", false).with_photo_paths(vec![path]);
        let id = controller.save(&mut draft).await.unwrap();

        let stored = storage.get(id).unwrap().unwrap();
        assert_eq!(stored.photos.len(), 1);
        assert_eq!(stored.photos[0].media_type(), Some("image/jpeg"));
    }
}
