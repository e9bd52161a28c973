// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;

use crate::bbox::BBox;

/// 统一的检测能力接口。
///
/// 输出坐标位于输入图像自身的坐标系中：对裁剪区域推理时，
/// 坐标相对于裁剪区域左上角。调用方不应依赖结果顺序。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }
}

/// 单个检测结果，构造后不可修改
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  class_id: u32,
  label: String,
  score: f32,
  bbox: BBox,
}

impl Detection {
  pub fn new(class_id: u32, label: impl Into<String>, score: f32, bbox: BBox) -> Self {
    Self {
      class_id,
      label: label.into(),
      score,
      bbox,
    }
  }

  pub fn class_id(&self) -> u32 {
    self.class_id
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn score(&self) -> f32 {
    self.score
  }

  pub fn bbox(&self) -> &BBox {
    &self.bbox
  }

  /// 返回换了边界框的副本
  pub fn with_bbox(&self, bbox: BBox) -> Self {
    Self {
      bbox,
      ..self.clone()
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }
}

impl From<Vec<Detection>> for DetectResult {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl FromIterator<Detection> for DetectResult {
  fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
    iter.into_iter().collect::<Vec<_>>().into()
  }
}

impl<'a> IntoIterator for &'a DetectResult {
  type Item = &'a Detection;
  type IntoIter = std::slice::Iter<'a, Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型加载错误 {path}: {reason}")]
  ModelLoadError { path: String, reason: String },
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("无法读取标签文件 {path}: {source}")]
  LabelFileError {
    path: String,
    source: std::io::Error,
  },
  #[error("模型推理失败: {0}")]
  ModelInferenceError(String),
}

impl ModelError {
  pub fn inference(msg: impl std::fmt::Display) -> Self {
    ModelError::ModelInferenceError(msg.to_string())
  }
}

mod labels;
pub use self::labels::{COCO_CLASSES, Labels};

mod yolov8;
pub use self::yolov8::{Yolov8, Yolov8Builder};
