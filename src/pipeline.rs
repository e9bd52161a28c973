// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline.rs - 两阶段检测流水线
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

use std::fmt;

use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::{
  bbox::BBox,
  model::{DetectResult, Detection, Model, ModelError},
};

/// 映射到原图坐标系的 PPE 检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
  /// 所属人员的裁剪区域（原图坐标）
  pub person: BBox,
  pub detection: Detection,
}

impl Annotation {
  pub fn bbox(&self) -> &BBox {
    self.detection.bbox()
  }

  /// 标签文本，例如 `helmet: 0.87`
  pub fn label_text(&self) -> String {
    format!("{}: {:.2}", self.detection.label(), self.detection.score())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  PersonDetection,
  PpeDetection { person: usize },
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Stage::PersonDetection => write!(f, "人员检测"),
      Stage::PpeDetection { person } => write!(f, "第 {} 个人的 PPE 检测", person + 1),
    }
  }
}

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("{stage}失败: {source}")]
  ModelInferenceError { stage: Stage, source: ModelError },
}

/// 先检测人员，再在每个人员区域内检测 PPE，结果映射回原图坐标。
pub struct TwoStagePipeline<P, Q> {
  person: P,
  ppe: Q,
}

impl<P, Q> TwoStagePipeline<P, Q>
where
  P: Model<Input = RgbImage, Output = DetectResult, Error = ModelError>,
  Q: Model<Input = RgbImage, Output = DetectResult, Error = ModelError>,
{
  pub fn new(person: P, ppe: Q) -> Self {
    Self { person, ppe }
  }

  /// 对一张图像执行两阶段检测，返回全部全局标注。
  ///
  /// 人员框先限制在图像范围内，面积为零的直接跳过且不调用 PPE 模型；
  /// PPE 框限制在裁剪区域内后按裁剪区域左上角平移。
  pub fn annotate(&self, image: &RgbImage) -> Result<Vec<Annotation>, PipelineError> {
    let persons = self
      .person
      .infer(image)
      .map_err(|source| PipelineError::ModelInferenceError {
        stage: Stage::PersonDetection,
        source,
      })?;
    debug!("检测到 {} 个人", persons.len());

    let mut annotations = Vec::new();
    for (index, person) in persons.iter().enumerate() {
      let Some(rect) = person.bbox().crop_rect(image.width(), image.height()) else {
        debug!("第 {} 个人的区域面积为零，跳过: {:?}", index + 1, person.bbox());
        continue;
      };

      let crop = image::imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();
      let items = self
        .ppe
        .infer(&crop)
        .map_err(|source| PipelineError::ModelInferenceError {
          stage: Stage::PpeDetection { person: index },
          source,
        })?;
      debug!("第 {} 个人检测到 {} 个 PPE", index + 1, items.len());

      let (ox, oy) = rect.origin();
      let parent = rect.to_bbox();
      for item in items.iter() {
        let local = item.bbox().clamp(rect.width as f32, rect.height as f32);
        if local.is_empty() {
          debug!("PPE 框位于裁剪区域之外，跳过: {:?}", item.bbox());
          continue;
        }
        annotations.push(Annotation {
          person: parent,
          detection: item.with_bbox(local.translate(ox, oy)),
        });
      }
    }

    Ok(annotations)
  }
}

impl<P, Q> Model for TwoStagePipeline<P, Q>
where
  P: Model<Input = RgbImage, Output = DetectResult, Error = ModelError>,
  Q: Model<Input = RgbImage, Output = DetectResult, Error = ModelError>,
{
  type Input = RgbImage;
  type Output = Vec<Annotation>;
  type Error = PipelineError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.annotate(input)
  }
}

#[cfg(test)]
mod tests {
  use std::cell::{Cell, RefCell};

  use super::*;

  /// 固定输出的模型，记录每次调用的输入尺寸
  struct Fixed {
    items: Vec<Detection>,
    calls: RefCell<Vec<(u32, u32)>>,
  }

  impl Fixed {
    fn new(items: Vec<Detection>) -> Self {
      Self {
        items,
        calls: RefCell::new(Vec::new()),
      }
    }
  }

  impl Model for Fixed {
    type Input = RgbImage;
    type Output = DetectResult;
    type Error = ModelError;

    fn infer(&self, input: &RgbImage) -> Result<DetectResult, ModelError> {
      self.calls.borrow_mut().push(input.dimensions());
      Ok(self.items.clone().into())
    }
  }

  struct Failing(Cell<usize>);

  impl Model for Failing {
    type Input = RgbImage;
    type Output = DetectResult;
    type Error = ModelError;

    fn infer(&self, _: &RgbImage) -> Result<DetectResult, ModelError> {
      self.0.set(self.0.get() + 1);
      Err(ModelError::inference("boom"))
    }
  }

  fn person(x0: f32, y0: f32, x1: f32, y1: f32) -> Detection {
    Detection::new(0, "person", 0.9, BBox::new(x0, y0, x1, y1))
  }

  #[test]
  fn ppe_boxes_are_translated_into_image_coordinates() {
    let image = RgbImage::new(400, 300);
    let pipeline = TwoStagePipeline::new(
      Fixed::new(vec![person(50.0, 40.0, 150.0, 200.0)]),
      Fixed::new(vec![Detection::new(
        0,
        "helmet",
        0.87,
        BBox::new(10.0, 10.0, 40.0, 60.0),
      )]),
    );

    let annotations = pipeline.annotate(&image).unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(*annotations[0].bbox(), BBox::new(60.0, 50.0, 90.0, 100.0));
    assert_eq!(annotations[0].label_text(), "helmet: 0.87");
    assert_eq!(annotations[0].person, BBox::new(50.0, 40.0, 150.0, 200.0));
    assert_eq!(*pipeline.ppe.calls.borrow(), vec![(100, 160)]);
  }

  #[test]
  fn zero_area_person_is_skipped_without_ppe_call() {
    let image = RgbImage::new(400, 300);
    let pipeline = TwoStagePipeline::new(
      Fixed::new(vec![person(50.0, 50.0, 50.0, 50.0)]),
      Failing(Cell::new(0)),
    );

    assert!(pipeline.annotate(&image).unwrap().is_empty());
    assert_eq!(pipeline.ppe.0.get(), 0);
  }

  #[test]
  fn no_person_means_no_annotation() {
    let image = RgbImage::new(64, 48);
    let pipeline = TwoStagePipeline::new(Fixed::new(vec![]), Failing(Cell::new(0)));
    assert!(pipeline.annotate(&image).unwrap().is_empty());
    assert_eq!(pipeline.ppe.0.get(), 0);
  }

  #[test]
  fn out_of_bounds_person_is_clamped() {
    let image = RgbImage::new(400, 300);
    let pipeline = TwoStagePipeline::new(
      Fixed::new(vec![
        person(350.0, 250.0, 480.0, 360.0),
        person(500.0, 10.0, 600.0, 100.0),
      ]),
      Fixed::new(vec![Detection::new(
        1,
        "vest",
        0.5,
        BBox::new(10.0, 10.0, 200.0, 200.0),
      )]),
    );

    let annotations = pipeline.annotate(&image).unwrap();
    assert_eq!(*pipeline.ppe.calls.borrow(), vec![(50, 50)]);
    assert_eq!(annotations.len(), 1);
    let global = *annotations[0].bbox();
    assert_eq!(global, BBox::new(360.0, 260.0, 400.0, 300.0));
    assert!(annotations[0].person.contains(&global));
    // 类别与分数原样保留，只换了框
    assert_eq!(annotations[0].detection.class_id(), 1);
    assert_eq!(annotations[0].detection.score(), 0.5);
  }

  #[test]
  fn person_without_ppe_does_not_stop_others() {
    struct PerCrop;
    impl Model for PerCrop {
      type Input = RgbImage;
      type Output = DetectResult;
      type Error = ModelError;

      fn infer(&self, input: &RgbImage) -> Result<DetectResult, ModelError> {
        if input.width() == 10 {
          Ok(DetectResult::default())
        } else {
          Ok(vec![Detection::new(0, "helmet", 0.7, BBox::new(0.0, 0.0, 5.0, 5.0))].into())
        }
      }
    }

    let image = RgbImage::new(100, 100);
    let pipeline = TwoStagePipeline::new(
      Fixed::new(vec![person(0.0, 0.0, 10.0, 10.0), person(20.0, 20.0, 40.0, 40.0)]),
      PerCrop,
    );

    let annotations = pipeline.annotate(&image).unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(*annotations[0].bbox(), BBox::new(20.0, 20.0, 25.0, 25.0));
  }

  #[test]
  fn ppe_failure_reports_stage() {
    let image = RgbImage::new(100, 100);
    let pipeline = TwoStagePipeline::new(
      Fixed::new(vec![person(0.0, 0.0, 10.0, 10.0)]),
      Failing(Cell::new(0)),
    );

    match pipeline.annotate(&image) {
      Err(PipelineError::ModelInferenceError { stage, .. }) => {
        assert_eq!(stage, Stage::PpeDetection { person: 0 })
      }
      other => panic!("unexpected: {other:?}"),
    }
  }
}
