use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_rekognition::{
    Client,
    error::ProvideErrorMetadata,
    primitives::Blob,
    types::{Attribute, Image},
};

use super::{DetectError, DetectedFace, EmotionDetector};
use crate::config::AwsConfig;

/// [`EmotionDetector`] backed by AWS Rekognition `DetectFaces`.
pub struct RekognitionDetector {
    client: Client,
}

impl RekognitionDetector {
    /// Builds a client from the default AWS credential chain for the
    /// configured region.
    pub async fn from_config(aws: &AwsConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(aws.region.clone()))
            .load()
            .await;
        let rekognition_config = aws_sdk_rekognition::config::Builder::from(&sdk_config).build();

        tracing::info!("Rekognition client configured for region {}", aws.region);
        Self {
            client: Client::from_conf(rekognition_config),
        }
    }
}

#[async_trait]
impl EmotionDetector for RekognitionDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedFace>, DetectError> {
        let output = self
            .client
            .detect_faces()
            .image(Image::builder().bytes(Blob::new(image.to_vec())).build())
            .attributes(Attribute::All)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service) => DetectError::Provider {
                    code: service.code().unwrap_or("Unknown").to_string(),
                    message: service.message().unwrap_or_default().to_string(),
                },
                None => DetectError::Unavailable(err.to_string()),
            })?;

        let faces = output
            .face_details()
            .iter()
            .map(|face| DetectedFace {
                emotions: face
                    .emotions()
                    .iter()
                    .filter_map(|e| {
                        let label = e.r#type()?.as_str().to_string();
                        Some((label, f64::from(e.confidence().unwrap_or_default())))
                    })
                    .collect(),
                age_low: face.age_range().and_then(|a| a.low()),
                age_high: face.age_range().and_then(|a| a.high()),
                smile: face.smile().and_then(|s| Option::from(s.value())),
                eyeglasses: face.eyeglasses().and_then(|e| Option::from(e.value())),
            })
            .collect::<Vec<_>>();

        tracing::debug!("Rekognition detected {} face(s)", faces.len());
        Ok(faces)
    }
}
