//! Facial emotion analysis.
//!
//! [`validate_image`] checks an upload before it leaves the process,
//! an [`EmotionDetector`] returns the raw per-face emotions and
//! [`summarize`] reduces them to the response the frontend shows.

pub mod rekognition;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    error::ApiError,
    types::{DominantEmotion, EmotionResult, FaceDetail},
    utils::round2,
};

pub use rekognition::RekognitionDetector;

/// Default upload limit in megabytes.
pub const DEFAULT_MAX_IMAGE_MB: usize = 5;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Error, PartialEq)]
pub enum ImageError {
    #[error("Image is empty")]
    Empty,

    #[error("Image exceeds the maximum size of {max_mb} MB")]
    TooLarge { max_mb: usize },

    #[error("Unsupported image format; only JPEG and PNG are accepted")]
    UnsupportedFormat,
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("No faces detected in the image")]
    NoFaces,

    #[error("Emotion detection failed ({code}): {message}")]
    Provider { code: String, message: String },

    #[error("Emotion detection failed: {0}")]
    Unavailable(String),
}

impl DetectError {
    /// Provider error code, e.g. `InvalidImageFormatException`.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            DetectError::Provider { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl From<DetectError> for ApiError {
    fn from(e: DetectError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

/// One face as reported by the detector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedFace {
    /// `(label, confidence)` pairs, confidence in percent.
    pub emotions: Vec<(String, f64)>,
    pub age_low: Option<i32>,
    pub age_high: Option<i32>,
    pub smile: Option<bool>,
    pub eyeglasses: Option<bool>,
}

#[async_trait]
pub trait EmotionDetector: Send + Sync {
    /// Detects faces and their emotions in a JPEG or PNG image.
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedFace>, DetectError>;
}

/// Checks size and file signature of an uploaded image.
pub fn validate_image(bytes: &[u8], max_mb: usize) -> Result<(), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    if bytes.len() > max_mb * 1024 * 1024 {
        return Err(ImageError::TooLarge { max_mb });
    }
    if bytes.starts_with(JPEG_MAGIC) || bytes.starts_with(PNG_MAGIC) {
        Ok(())
    } else {
        Err(ImageError::UnsupportedFormat)
    }
}

/// Picks the dominant emotion of the first face.
///
/// `all_emotions` holds the first face's label to confidence map; every face
/// is listed in `face_details`.
pub fn summarize(faces: Vec<DetectedFace>) -> Result<EmotionResult, DetectError> {
    let first = faces.first().ok_or(DetectError::NoFaces)?;

    let dominant = first
        .emotions
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or(DetectError::NoFaces)?;

    let dominant_emotion = DominantEmotion {
        label: dominant.0.clone(),
        confidence: round2(dominant.1),
    };

    let all_emotions: BTreeMap<String, f64> = first
        .emotions
        .iter()
        .map(|(label, confidence)| (label.clone(), round2(*confidence)))
        .collect();

    let face_details = faces
        .iter()
        .map(|face| FaceDetail {
            emotions: face
                .emotions
                .iter()
                .map(|(label, confidence)| DominantEmotion {
                    label: label.clone(),
                    confidence: round2(*confidence),
                })
                .collect(),
            age_low: face.age_low,
            age_high: face.age_high,
            smile: face.smile,
            eyeglasses: face.eyeglasses,
        })
        .collect();

    Ok(EmotionResult {
        faces_detected: faces.len(),
        dominant_emotion,
        all_emotions,
        face_details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(emotions: &[(&str, f64)]) -> DetectedFace {
        DetectedFace {
            emotions: emotions.iter().map(|(l, c)| (l.to_string(), *c)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_image() {
        assert_eq!(validate_image(&[], 5), Err(ImageError::Empty));
        assert_eq!(
            validate_image(b"notimage", 5),
            Err(ImageError::UnsupportedFormat)
        );
        assert!(validate_image(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00], 5).is_ok());
        assert!(validate_image(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00], 5).is_ok());

        let mut big = vec![0xFF, 0xD8, 0xFF];
        big.resize(1024 * 1024 + 1, 0);
        assert_eq!(validate_image(&big, 1), Err(ImageError::TooLarge { max_mb: 1 }));
    }

    #[test]
    fn test_summarize_picks_highest_confidence() {
        let result = summarize(vec![face(&[("SAD", 10.5), ("HAPPY", 90.1234)])]).unwrap();
        assert_eq!(result.faces_detected, 1);
        assert_eq!(result.dominant_emotion.label, "HAPPY");
        assert_eq!(result.dominant_emotion.confidence, 90.12);
        assert_eq!(result.all_emotions.get("SAD"), Some(&10.5));
    }

    #[test]
    fn test_summarize_uses_first_face() {
        let result = summarize(vec![
            face(&[("CALM", 70.0), ("HAPPY", 20.0)]),
            face(&[("ANGRY", 99.0)]),
        ])
        .unwrap();
        assert_eq!(result.faces_detected, 2);
        assert_eq!(result.dominant_emotion.label, "CALM");
        assert!(!result.all_emotions.contains_key("ANGRY"));
        assert_eq!(result.face_details.len(), 2);
    }

    #[test]
    fn test_summarize_without_faces() {
        assert!(matches!(summarize(Vec::new()), Err(DetectError::NoFaces)));
        assert!(matches!(summarize(vec![face(&[])]), Err(DetectError::NoFaces)));
    }

    #[test]
    fn test_provider_error_code() {
        let err = DetectError::Provider {
            code: "InvalidImageFormatException".to_string(),
            message: "bad image".to_string(),
        };
        assert_eq!(err.error_code(), Some("InvalidImageFormatException"));
        assert_eq!(ApiError::from(err).status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
