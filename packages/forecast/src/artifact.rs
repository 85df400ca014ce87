use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use quakecast_forecast_models::{FeatureVector, LocationEncoder, TrainingReport};
use quakecast_forest::{RandomForestClassifier, RandomForestRegressor};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Version of the on-disk bundle layout this build writes and accepts.
pub const ARTIFACT_FORMAT: u32 = 1;

/// Errors returned by artifact IO.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Reading or writing the bundle file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Bundle encoding failed.
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    /// Bundle decoding failed.
    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    /// The stored digest does not match the payload.
    #[error("artifact digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
    /// The bundle was written by an incompatible format version.
    #[error("unsupported artifact format {found}, expected {expected}")]
    FormatVersion { found: u32, expected: u32 },
    /// The bundle was trained against a different feature schema.
    #[error("artifact feature schema mismatch: {found:?}")]
    SchemaMismatch { found: Vec<String> },
}

/// Identity of one trained bundle. A retrain always mints a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub format: u32,
}

/// Everything a serving process needs, bundled and immutable: the fitted
/// encoder, both trained forests, the feature schema they were trained
/// against, and the training diagnostics.
///
/// Bundles are MessagePack files wrapped in a SHA-256 digest envelope;
/// [`ForecastArtifact::load`] refuses tampered payloads, unknown format
/// versions, and schema drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastArtifact {
    pub version: ArtifactVersion,
    pub feature_schema: Vec<String>,
    pub encoder: LocationEncoder,
    pub magnitude_model: RandomForestRegressor,
    pub bucket_model: RandomForestClassifier,
    pub report: TrainingReport,
}

#[derive(Serialize, Deserialize)]
struct ArtifactEnvelope {
    digest: String,
    payload: Vec<u8>,
}

impl ForecastArtifact {
    pub(crate) fn new(
        encoder: LocationEncoder,
        magnitude_model: RandomForestRegressor,
        bucket_model: RandomForestClassifier,
        report: TrainingReport,
    ) -> Self {
        Self {
            version: ArtifactVersion {
                id: Uuid::new_v4(),
                created_at: Utc::now(),
                format: ARTIFACT_FORMAT,
            },
            feature_schema: FeatureVector::FIELD_NAMES
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
            encoder,
            magnitude_model,
            bucket_model,
            report,
        }
    }

    /// Writes the bundle to `path`.
    ///
    /// # Errors
    ///
    /// * `ArtifactError::Encode` when serialization fails
    /// * `ArtifactError::Io` when the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let payload = rmp_serde::to_vec_named(self)?;
        let envelope = ArtifactEnvelope {
            digest: hex::encode(Sha256::digest(&payload)),
            payload,
        };
        fs::write(path, rmp_serde::to_vec_named(&envelope)?)?;
        log::info!(
            "wrote forecast artifact {} to {}",
            self.version.id,
            path.display()
        );
        Ok(())
    }

    /// Reads and verifies a bundle from `path`.
    ///
    /// # Errors
    ///
    /// * `ArtifactError::Io` when the file cannot be read
    /// * `ArtifactError::Decode` when either envelope or payload is corrupt
    /// * `ArtifactError::DigestMismatch` when the payload was tampered with
    /// * `ArtifactError::FormatVersion` for bundles from other layouts
    /// * `ArtifactError::SchemaMismatch` for bundles trained on a different
    ///   feature schema
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let envelope: ArtifactEnvelope = rmp_serde::from_slice(&fs::read(path)?)?;
        let actual = hex::encode(Sha256::digest(&envelope.payload));
        if actual != envelope.digest {
            return Err(ArtifactError::DigestMismatch {
                expected: envelope.digest,
                actual,
            });
        }
        let artifact: Self = rmp_serde::from_slice(&envelope.payload)?;
        artifact.validate()?;
        log::info!(
            "loaded forecast artifact {} from {} ({} locations)",
            artifact.version.id,
            path.display(),
            artifact.encoder.len()
        );
        Ok(artifact)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.version.format != ARTIFACT_FORMAT {
            return Err(ArtifactError::FormatVersion {
                found: self.version.format,
                expected: ARTIFACT_FORMAT,
            });
        }
        if self
            .feature_schema
            .iter()
            .map(String::as_str)
            .ne(FeatureVector::FIELD_NAMES)
        {
            return Err(ArtifactError::SchemaMismatch {
                found: self.feature_schema.clone(),
            });
        }
        Ok(())
    }
}
