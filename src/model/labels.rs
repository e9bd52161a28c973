// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/labels.rs - 类别标签
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

use std::borrow::Cow;
use std::path::Path;

use tracing::debug;

use crate::model::ModelError;

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// 类别 id 到名称的映射
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Labels {
  names: Vec<String>,
}

impl Labels {
  pub fn coco() -> Self {
    Self {
      names: COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
    }
  }

  /// 每行一个类别名，空行忽略
  pub fn parse(text: &str) -> Self {
    let names = text
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(str::to_string)
      .collect();
    Self { names }
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ModelError::LabelFileError {
      path: path.display().to_string(),
      source,
    })?;
    let labels = Self::parse(&text);
    debug!("从 {} 读取 {} 个类别", path.display(), labels.len());
    Ok(labels)
  }

  /// 按类别数选择默认标签：80 类时使用 COCO，否则为空表
  pub fn default_for(num_classes: usize) -> Self {
    if num_classes == COCO_CLASSES.len() {
      Self::coco()
    } else {
      Self::default()
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 类别名称，越界时为 `class{id}`
  pub fn name(&self, id: u32) -> Cow<'_, str> {
    match self.names.get(id as usize) {
      Some(name) => Cow::Borrowed(name.as_str()),
      None => Cow::Owned(format!("class{id}")),
    }
  }

  pub fn id_of(&self, name: &str) -> Option<u32> {
    self.names.iter().position(|n| n == name).map(|i| i as u32)
  }
}
