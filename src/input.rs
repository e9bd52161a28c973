// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 图像输入
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

use thiserror::Error;

mod read_image_file;
pub use self::read_image_file::{ImageDirectoryInput, ImageDirectoryIter};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("无法读取输入目录 {}: {source}", path.display())]
  DirectoryError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("无法读取图像文件 {}: {source}", path.display())]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("图像解码失败 {}: {source}", path.display())]
  ImageDecodeError {
    path: PathBuf,
    source: image::ImageError,
  },
}

impl ImageFileInputError {
  /// 出错的文件或目录路径
  pub fn path(&self) -> &std::path::Path {
    match self {
      ImageFileInputError::DirectoryError { path, .. }
      | ImageFileInputError::IoError { path, .. }
      | ImageFileInputError::ImageDecodeError { path, .. } => path,
    }
  }
}
