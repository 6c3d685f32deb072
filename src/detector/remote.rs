// 该文件是 Hanjian （焊检） 项目的一部分。
// src/detector/remote.rs - 远程推理服务客户端
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Hanjian 项目贡献者

use std::io::Cursor;
use std::time::Duration;

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use reqwest::blocking::multipart;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::detector::{Detection, Detector};
use crate::settings::Thresholds;

const JPEG_QUALITY: u8 = 90;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum RemoteDetectorError {
  #[error("推理服务地址不合法: {0}")]
  Endpoint(#[from] url::ParseError),
  #[error("帧编码失败: {0}")]
  Encode(#[from] image::ImageError),
  #[error("推理请求失败: {0}")]
  Http(#[from] reqwest::Error),
  #[error("推理服务返回错误状态: {0}")]
  Status(reqwest::StatusCode),
  #[error("推理结果解析失败: {0}")]
  Decode(#[from] serde_json::Error),
}

/// 托管检测服务的推理响应
#[derive(Debug, Deserialize)]
struct RemoteResponse {
  predictions: Vec<RemotePrediction>,
}

#[derive(Debug, Deserialize)]
struct RemotePrediction {
  x: f32,
  y: f32,
  width: f32,
  height: f32,
  #[serde(rename = "class")]
  class_id: String,
  confidence: f32,
}

impl From<RemotePrediction> for Detection {
  fn from(prediction: RemotePrediction) -> Self {
    Detection {
      class_id: prediction.class_id,
      x: prediction.x,
      y: prediction.y,
      width: prediction.width,
      height: prediction.height,
      confidence: prediction.confidence,
    }
  }
}

pub struct RemoteDetectorBuilder {
  base: String,
  model: String,
  version: String,
  api_key: String,
  timeout: Duration,
}

impl RemoteDetectorBuilder {
  pub fn new(api_key: impl Into<String>) -> Self {
    RemoteDetectorBuilder {
      base: String::from("https://detect.roboflow.com"),
      model: String::from("welding-defects-detection-wtxow"),
      version: String::from("1"),
      api_key: api_key.into(),
      timeout: DEFAULT_TIMEOUT,
    }
  }

  pub fn base(mut self, base: impl Into<String>) -> Self {
    self.base = base.into();
    self
  }

  pub fn model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }

  pub fn version(mut self, version: impl Into<String>) -> Self {
    self.version = version.into();
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn build(self) -> Result<RemoteDetector, RemoteDetectorError> {
    let mut endpoint = Url::parse(&self.base)?;
    endpoint.set_path(&format!(
      "{}/{}",
      urlencoding::encode(&self.model),
      urlencoding::encode(&self.version)
    ));

    debug!("推理端点: {}", endpoint);

    let client = reqwest::blocking::Client::builder()
      .timeout(self.timeout)
      .build()?;

    Ok(RemoteDetector {
      client,
      endpoint,
      api_key: self.api_key,
    })
  }
}

/// 远程推理服务客户端
///
/// 客户端在启动时构建一次，之后所有帧复用同一个连接池，
/// 不要为每帧新建客户端。阈值随每次调用传入，原样写进请求参数。
pub struct RemoteDetector {
  client: reqwest::blocking::Client,
  endpoint: Url,
  api_key: String,
}

impl RemoteDetector {
  pub fn builder(api_key: impl Into<String>) -> RemoteDetectorBuilder {
    RemoteDetectorBuilder::new(api_key)
  }

  fn encode_frame(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    let mut encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    encoder.encode_image(image)?;
    Ok(buffer)
  }

  fn request_url(&self, thresholds: Thresholds) -> Url {
    let mut url = self.endpoint.clone();
    url
      .query_pairs_mut()
      .append_pair("api_key", &self.api_key)
      .append_pair("confidence", &thresholds.confidence.to_string())
      .append_pair("overlap", &thresholds.overlap.to_string());
    url
  }
}

impl Detector for RemoteDetector {
  type Error = RemoteDetectorError;

  fn detect(
    &self,
    image: &RgbImage,
    thresholds: Thresholds,
  ) -> Result<Vec<Detection>, Self::Error> {
    let jpeg = Self::encode_frame(image)?;
    debug!(
      "送检帧 {}x{}, {} 字节, 置信度阈值 {}, 重叠阈值 {}",
      image.width(),
      image.height(),
      jpeg.len(),
      thresholds.confidence,
      thresholds.overlap
    );

    let part = multipart::Part::bytes(jpeg)
      .file_name("frame.jpg")
      .mime_str("image/jpeg")?;
    let form = multipart::Form::new().part("file", part);

    let response = self
      .client
      .post(self.request_url(thresholds))
      .multipart(form)
      .send()?;

    let status = response.status();
    if !status.is_success() {
      warn!("推理服务拒绝请求: {}", status);
      return Err(RemoteDetectorError::Status(status));
    }

    let body = response.text()?;
    let parsed: RemoteResponse = serde_json::from_str(&body)?;

    debug!("检测到 {} 条记录", parsed.predictions.len());
    Ok(parsed.predictions.into_iter().map(Detection::from).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn response_decoding() {
    let body = r#"{
      "time": 0.21,
      "image": {"width": 640, "height": 480},
      "predictions": [
        {
          "x": 320.5, "y": 240.0, "width": 48.0, "height": 32.0,
          "confidence": 0.87, "class": "3", "class_id": 3,
          "detection_id": "f9e1"
        }
      ]
    }"#;

    let parsed: RemoteResponse = serde_json::from_str(body).unwrap();
    assert_eq!(parsed.predictions.len(), 1);

    let detection = Detection::from(
      parsed
        .predictions
        .into_iter()
        .next()
        .unwrap(),
    );
    assert_eq!(detection.class_id, "3");
    assert_eq!(detection.x, 320.5);
    assert_eq!(detection.width, 48.0);
  }

  #[test]
  fn empty_predictions_is_a_valid_result() {
    let body = r#"{"predictions": []}"#;
    let parsed: RemoteResponse = serde_json::from_str(body).unwrap();
    assert!(parsed.predictions.is_empty());
  }

  #[test]
  fn endpoint_path_includes_model_and_version() {
    let detector = RemoteDetectorBuilder::new("secret")
      .base("https://example.invalid")
      .model("weld defects")
      .version("2")
      .build()
      .unwrap();
    assert_eq!(detector.endpoint.path(), "/weld%20defects/2");

    let url = detector.request_url(Thresholds::default());
    let query = url.query().unwrap();
    assert!(query.contains("api_key=secret"));
    assert!(query.contains("confidence=10"));
    assert!(query.contains("overlap=30"));
  }
}
