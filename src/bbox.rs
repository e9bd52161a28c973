// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bbox.rs - 边界框几何运算
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

/// 轴对齐边界框，像素坐标 `[x_min, y_min, x_max, y_max]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
  pub x_min: f32,
  pub y_min: f32,
  pub x_max: f32,
  pub y_max: f32,
}

impl BBox {
  pub const fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
    Self {
      x_min,
      y_min,
      x_max,
      y_max,
    }
  }

  /// 由中心点与宽高构造（YOLO 输出格式）
  pub fn from_cxcywh(cx: f32, cy: f32, w: f32, h: f32) -> Self {
    Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
  }

  pub fn width(&self) -> f32 {
    (self.x_max - self.x_min).max(0.0)
  }

  pub fn height(&self) -> f32 {
    (self.y_max - self.y_min).max(0.0)
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  pub fn is_empty(&self) -> bool {
    self.width() <= 0.0 || self.height() <= 0.0
  }

  /// 将坐标限制在 `[0, width] x [0, height]` 内。
  /// 已在范围内的框保持不变。
  pub fn clamp(&self, width: f32, height: f32) -> Self {
    Self {
      x_min: self.x_min.clamp(0.0, width),
      y_min: self.y_min.clamp(0.0, height),
      x_max: self.x_max.clamp(0.0, width),
      y_max: self.y_max.clamp(0.0, height),
    }
  }

  pub fn translate(&self, dx: f32, dy: f32) -> Self {
    Self {
      x_min: self.x_min + dx,
      y_min: self.y_min + dy,
      x_max: self.x_max + dx,
      y_max: self.y_max + dy,
    }
  }

  pub fn contains(&self, other: &BBox) -> bool {
    other.x_min >= self.x_min
      && other.y_min >= self.y_min
      && other.x_max <= self.x_max
      && other.y_max <= self.y_max
  }

  pub fn intersection_area(&self, other: &BBox) -> f32 {
    let l = self.x_min.max(other.x_min);
    let r = self.x_max.min(other.x_max);
    let t = self.y_min.max(other.y_min);
    let b = self.y_max.min(other.y_max);
    (r - l).max(0.0) * (b - t).max(0.0)
  }

  pub fn iou(&self, other: &BBox) -> f32 {
    let inter = self.intersection_area(other);
    let union = self.area() + other.area() - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
  }

  /// 计算该框在 `width x height` 图像内对应的整数裁剪区域。
  ///
  /// 左上角向下取整，右下角向上取整，随后限制在图像范围内。
  /// 面积为零（或完全在图像外）时返回 `None`。
  pub fn crop_rect(&self, width: u32, height: u32) -> Option<CropRect> {
    let x0 = clamp_to_u32(self.x_min.floor(), width);
    let y0 = clamp_to_u32(self.y_min.floor(), height);
    let x1 = clamp_to_u32(self.x_max.ceil(), width);
    let y1 = clamp_to_u32(self.y_max.ceil(), height);

    if x1 <= x0 || y1 <= y0 {
      return None;
    }

    Some(CropRect {
      x: x0,
      y: y0,
      width: x1 - x0,
      height: y1 - y0,
    })
  }
}

fn clamp_to_u32(v: f32, max: u32) -> u32 {
  if v.is_nan() {
    return 0;
  }
  v.clamp(0.0, max as f32) as u32
}

/// 图像内的整数裁剪区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl CropRect {
  pub fn origin(&self) -> (f32, f32) {
    (self.x as f32, self.y as f32)
  }

  pub fn to_bbox(&self) -> BBox {
    BBox::new(
      self.x as f32,
      self.y as f32,
      (self.x + self.width) as f32,
      (self.y + self.height) as f32,
    )
  }
}

/// 贪心 NMS：按分数降序保留，与已保留框 IoU 超过阈值的丢弃。
pub fn non_max_suppression<T, F>(items: &mut Vec<T>, iou_threshold: f32, key: F)
where
  F: Fn(&T) -> (BBox, f32),
{
  items.sort_by(|a, b| key(b).1.total_cmp(&key(a).1));

  let mut kept = 0;
  for index in 0..items.len() {
    let (candidate, _) = key(&items[index]);
    let drop = items[..kept]
      .iter()
      .any(|prev| key(prev).0.iou(&candidate) > iou_threshold);
    if !drop {
      items.swap(kept, index);
      kept += 1;
    }
  }
  items.truncate(kept);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clamp_is_noop_inside_bounds() {
    let b = BBox::new(10.0, 20.0, 100.0, 200.0);
    assert_eq!(b.clamp(400.0, 300.0), b);
    assert_eq!(b.clamp(400.0, 300.0).clamp(400.0, 300.0), b);
  }

  #[test]
  fn clamp_pulls_outside_box_into_image() {
    let b = BBox::new(-20.0, -5.0, 450.0, 320.0);
    assert_eq!(b.clamp(400.0, 300.0), BBox::new(0.0, 0.0, 400.0, 300.0));
  }

  #[test]
  fn crop_rect_rounds_outwards() {
    let r = BBox::new(10.4, 20.6, 30.2, 40.0).crop_rect(100, 100).unwrap();
    assert_eq!(
      r,
      CropRect {
        x: 10,
        y: 20,
        width: 21,
        height: 20
      }
    );
  }

  #[test]
  fn crop_rect_rejects_zero_area() {
    assert!(BBox::new(50.0, 50.0, 50.0, 50.0).crop_rect(400, 300).is_none());
    assert!(BBox::new(500.0, 10.0, 600.0, 50.0).crop_rect(400, 300).is_none());
    assert!(BBox::new(-80.0, -80.0, -10.0, -10.0).crop_rect(400, 300).is_none());
  }

  #[test]
  fn crop_rect_is_clamped() {
    let r = BBox::new(350.0, 250.0, 500.0, 400.0).crop_rect(400, 300).unwrap();
    assert_eq!(r.to_bbox(), BBox::new(350.0, 250.0, 400.0, 300.0));
  }

  #[test]
  fn iou_of_identical_and_disjoint_boxes() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(20.0, 20.0, 30.0, 30.0);
    assert_eq!(a.iou(&a), 1.0);
    assert_eq!(a.iou(&b), 0.0);
    assert_eq!(BBox::default().iou(&BBox::default()), 0.0);
  }

  #[test]
  fn nms_keeps_highest_score_of_overlapping_group() {
    let mut items = vec![
      (BBox::new(0.0, 0.0, 10.0, 10.0), 0.6),
      (BBox::new(1.0, 1.0, 11.0, 11.0), 0.9),
      (BBox::new(50.0, 50.0, 60.0, 60.0), 0.3),
    ];
    non_max_suppression(&mut items, 0.45, |(b, s)| (*b, *s));
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].1, 0.9);
    assert_eq!(items[1].1, 0.3);
  }
}
