// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/yolov8.rs - YOLOv8 ONNX 检测模型
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::PathBuf;

use image::{RgbImage, imageops::FilterType};
use tracing::{debug, info, warn};
use tract_onnx::prelude::*;
use tract_onnx::prelude::tract_ndarray::{Array4, ArrayView2, Axis, Ix3};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  bbox::{BBox, non_max_suppression},
  model::{DetectResult, Detection, Labels, Model, ModelError},
};

const YOLOV8_DEFAULT_INPUT_SIZE: u32 = 640;
const YOLOV8_DEFAULT_CONF: f32 = 0.25;
const YOLOV8_DEFAULT_IOU: f32 = 0.45;
const YOLOV8_LETTERBOX_FILL: f32 = 144.0 / 255.0;
const YOLOV8_CXYWH_OFFSET: usize = 4;

type Yolov8Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// 基于 tract-onnx 的 YOLOv8 检测器
///
/// 输入为任意尺寸的 RGB 图像，内部做 letterbox 缩放；
/// 输出坐标映射回输入图像的像素坐标系。
pub struct Yolov8 {
  plan: Yolov8Plan,
  input_size: u32,
  conf: f32,
  iou: f32,
  labels: Labels,
  keep_classes: Option<Vec<u32>>,
}

#[derive(Debug, Clone)]
pub struct Yolov8Builder {
  model_path: PathBuf,
  input_size: u32,
  conf: f32,
  iou: f32,
  labels_path: Option<PathBuf>,
  keep_classes: Option<Vec<u32>>,
  prefer_labels: Vec<String>,
}

impl FromUrlWithScheme for Yolov8Builder {
  const SCHEME: &'static str = "yolov8";
}

impl FromUrl for Yolov8Builder {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案, 实际为 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| ModelError::ModelPathError(format!("模型路径编码无效: {e}")))?;
    if path.is_empty() {
      return Err(ModelError::ModelPathError("模型路径为空".to_string()));
    }

    let mut builder = Yolov8Builder::new(path.into_owned());
    for (key, value) in url.query_pairs() {
      builder = match &*key {
        "size" => builder.input_size(parse_param(&key, &value)?),
        "conf" => builder.confidence(parse_param(&key, &value)?),
        "iou" => builder.iou(parse_param(&key, &value)?),
        "labels" => builder.labels_path(&*value),
        "classes" => {
          let ids = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse_param::<u32>(&key, s))
            .collect::<Result<Vec<_>, _>>()?;
          builder.keep_classes(ids)
        }
        other => {
          warn!("忽略未知的模型参数: {}={}", other, value);
          builder
        }
      };
    }

    if builder.input_size == 0 {
      return Err(ModelError::ModelPathError("size 必须大于 0".to_string()));
    }

    Ok(builder)
  }
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ModelError> {
  value
    .parse()
    .map_err(|_| ModelError::ModelPathError(format!("模型参数 {key} 的值无效: '{value}'")))
}

impl Yolov8Builder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      input_size: YOLOV8_DEFAULT_INPUT_SIZE,
      conf: YOLOV8_DEFAULT_CONF,
      iou: YOLOV8_DEFAULT_IOU,
      labels_path: None,
      keep_classes: None,
      prefer_labels: Vec::new(),
    }
  }

  /// 由命令行给出的模型引用构造。
  ///
  /// 接受 `yolov8://...` URL，其余一律视为本地文件路径。
  pub fn from_reference(reference: &str) -> Result<Self, ModelError> {
    if let Ok(url) = Url::parse(reference)
      && url.scheme() == Self::SCHEME
    {
      return Self::from_url(&url);
    }

    let path = std::path::absolute(reference)
      .map_err(|e| ModelError::ModelPathError(format!("无法解析模型路径 '{reference}': {e}")))?;
    Ok(Self::new(path))
  }

  pub fn model_path(&self) -> &std::path::Path {
    &self.model_path
  }

  pub fn input_size(mut self, size: u32) -> Self {
    self.input_size = size;
    self
  }

  pub fn confidence(mut self, conf: f32) -> Self {
    self.conf = conf;
    self
  }

  pub fn iou(mut self, iou: f32) -> Self {
    self.iou = iou;
    self
  }

  pub fn labels_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.labels_path = Some(path.into());
    self
  }

  pub fn keep_classes(mut self, ids: Vec<u32>) -> Self {
    self.keep_classes = Some(ids);
    self
  }

  /// 未显式指定 `classes` 时，若标签表中存在这些名称则只保留它们
  pub fn prefer_labels<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
    self.prefer_labels = names.into_iter().map(Into::into).collect();
    self
  }

  pub fn build(self) -> Result<Yolov8, ModelError> {
    let path = self.model_path.display().to_string();
    let load_err = |stage: &str, e: TractError| ModelError::ModelLoadError {
      path: path.clone(),
      reason: format!("{stage}: {e:#}"),
    };

    info!("加载模型文件: {}", path);
    let size = self.input_size as usize;
    let plan = tract_onnx::onnx()
      .model_for_path(&self.model_path)
      .map_err(|e| load_err("无法读取 ONNX 模型", e))?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
      )
      .map_err(|e| load_err("无法设置输入形状", e))?
      .into_optimized()
      .map_err(|e| load_err("模型优化失败", e))?
      .into_runnable()
      .map_err(|e| load_err("无法构建可执行模型", e))?;

    let num_classes = plan
      .model()
      .output_fact(0)
      .ok()
      .and_then(|fact| fact.shape.as_concrete().map(|dims| dims.to_vec()))
      .and_then(|dims| match dims.as_slice() {
        [_, rows, _] if *rows > YOLOV8_CXYWH_OFFSET => Some(rows - YOLOV8_CXYWH_OFFSET),
        _ => None,
      });
    debug!("模型输出类别数: {:?}", num_classes);

    let labels = match &self.labels_path {
      Some(path) => Labels::from_file(path)?,
      None => Labels::default_for(num_classes.unwrap_or_default()),
    };
    if let Some(nc) = num_classes
      && !labels.is_empty()
      && labels.len() != nc
    {
      warn!("标签数量 {} 与模型类别数 {} 不一致", labels.len(), nc);
    }

    let keep_classes = resolve_keep_classes(self.keep_classes, &self.prefer_labels, &labels);

    info!(
      "模型加载完成: 输入 {}x{}, conf={}, iou={}, 保留类别 {:?}",
      self.input_size, self.input_size, self.conf, self.iou, keep_classes
    );

    Ok(Yolov8 {
      plan,
      input_size: self.input_size,
      conf: self.conf,
      iou: self.iou,
      labels,
      keep_classes,
    })
  }
}

/// 显式给出的 `classes` 优先；否则保留标签表中存在的偏好类别，都不存在时不过滤
fn resolve_keep_classes(
  explicit: Option<Vec<u32>>,
  prefer: &[String],
  labels: &Labels,
) -> Option<Vec<u32>> {
  if explicit.is_some() {
    return explicit;
  }
  let ids: Vec<u32> = prefer.iter().filter_map(|name| labels.id_of(name)).collect();
  if ids.is_empty() { None } else { Some(ids) }
}

fn check_input(image: &RgbImage) -> Result<(), ModelError> {
  if image.width() == 0 || image.height() == 0 {
    return Err(ModelError::inference(format!(
      "输入图像为空: {}x{}",
      image.width(),
      image.height()
    )));
  }
  Ok(())
}

/// letterbox：等比缩放后放在左上角，其余填充灰色，像素归一化到 [0, 1]，NCHW。
/// 返回输入数组与缩放比例。
fn letterbox(image: &RgbImage, size: u32) -> (Array4<f32>, f32) {
  let (w0, h0) = (image.width() as f32, image.height() as f32);
  let ratio = (size as f32 / w0).min(size as f32 / h0);
  let w_new = ((w0 * ratio).round() as u32).clamp(1, size);
  let h_new = ((h0 * ratio).round() as u32).clamp(1, size);

  let resized = image::imageops::resize(image, w_new, h_new, FilterType::Triangle);

  let mut input = Array4::from_elem((1, 3, size as usize, size as usize), YOLOV8_LETTERBOX_FILL);
  for (x, y, pixel) in resized.enumerate_pixels() {
    let (x, y) = (x as usize, y as usize);
    let [r, g, b] = pixel.0;
    input[[0, 0, y, x]] = r as f32 / 255.0;
    input[[0, 1, y, x]] = g as f32 / 255.0;
    input[[0, 2, y, x]] = b as f32 / 255.0;
  }

  (input, ratio)
}

impl Model for Yolov8 {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    check_input(input)?;

    let (input_array, ratio) = letterbox(input, self.input_size);
    let tensor = input_array.into_tensor();

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(|e| ModelError::inference(format!("{e:#}")))?;

    let output = outputs
      .first()
      .ok_or_else(|| ModelError::inference("模型没有输出"))?;
    let preds = output
      .to_array_view::<f32>()
      .map_err(|e| ModelError::inference(format!("输出张量不是 f32: {e:#}")))?
      .into_dimensionality::<Ix3>()
      .map_err(|e| ModelError::inference(format!("输出张量形状无效: {e}")))?;
    if preds.shape()[0] == 0 {
      return Err(ModelError::inference("输出张量批大小为 0"));
    }

    let params = DecodeParams {
      ratio,
      source_width: input.width() as f32,
      source_height: input.height() as f32,
      conf: self.conf,
      iou: self.iou,
      keep_classes: self.keep_classes.as_deref(),
    };
    let raw = decode_predictions(preds.index_axis(Axis(0), 0), &params);

    debug!("检测到 {} 个物体", raw.len());

    Ok(
      raw
        .into_iter()
        .map(|(id, score, bbox)| Detection::new(id, self.labels.name(id), score, bbox))
        .collect(),
    )
  }
}

pub(crate) struct DecodeParams<'a> {
  pub ratio: f32,
  pub source_width: f32,
  pub source_height: f32,
  pub conf: f32,
  pub iou: f32,
  pub keep_classes: Option<&'a [u32]>,
}

/// 解码 `[4 + nc, anchors]` 输出：取最高分类别、阈值过滤、
/// 还原 letterbox 缩放、裁剪到源图像范围并做 NMS。
pub(crate) fn decode_predictions(
  preds: ArrayView2<'_, f32>,
  params: &DecodeParams<'_>,
) -> Vec<(u32, f32, BBox)> {
  let rows = preds.nrows();
  if rows <= YOLOV8_CXYWH_OFFSET {
    return Vec::new();
  }

  let mut data = Vec::new();
  for anchor in preds.axis_iter(Axis(1)) {
    let mut best = (0usize, f32::NEG_INFINITY);
    for c in YOLOV8_CXYWH_OFFSET..rows {
      if anchor[c] > best.1 {
        best = (c - YOLOV8_CXYWH_OFFSET, anchor[c]);
      }
    }
    let (id, score) = (best.0 as u32, best.1);

    if score < params.conf {
      continue;
    }
    if let Some(keep) = params.keep_classes
      && !keep.contains(&id)
    {
      continue;
    }

    let bbox = BBox::from_cxcywh(
      anchor[0] / params.ratio,
      anchor[1] / params.ratio,
      anchor[2] / params.ratio,
      anchor[3] / params.ratio,
    )
    .clamp(params.source_width, params.source_height);
    if bbox.is_empty() {
      continue;
    }

    data.push((id, score, bbox));
  }

  non_max_suppression(&mut data, params.iou, |(_, score, bbox)| (*bbox, *score));
  data
}
