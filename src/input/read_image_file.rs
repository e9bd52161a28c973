// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像目录输入
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

use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::{debug, info};

use crate::frame::ImageFile;
use crate::input::ImageFileInputError;

/// 目录中的图像文件，按文件名排序后逐个解码
pub struct ImageDirectoryInput {
  entries: Vec<PathBuf>,
}

impl ImageDirectoryInput {
  pub fn open(directory: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let directory = directory.as_ref().to_path_buf();
    let dir_err = |source| ImageFileInputError::DirectoryError {
      path: directory.clone(),
      source,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(&directory).map_err(dir_err)? {
      let entry = entry.map_err(dir_err)?;
      let path = entry.path();
      if path.is_file() {
        entries.push(path);
      } else {
        debug!("跳过非文件条目: {}", path.display());
      }
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    info!("输入目录 {} 中共有 {} 个文件", directory.display(), entries.len());

    Ok(Self { entries })
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl IntoIterator for ImageDirectoryInput {
  type Item = Result<ImageFile, ImageFileInputError>;
  type IntoIter = ImageDirectoryIter;

  fn into_iter(self) -> Self::IntoIter {
    ImageDirectoryIter {
      inner: self.entries.into_iter(),
    }
  }
}

pub struct ImageDirectoryIter {
  inner: std::vec::IntoIter<PathBuf>,
}

impl Iterator for ImageDirectoryIter {
  type Item = Result<ImageFile, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.inner.next().map(|path| read_image(&path))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.inner.size_hint()
  }
}

fn read_image(path: &Path) -> Result<ImageFile, ImageFileInputError> {
  let io_err = |source| ImageFileInputError::IoError {
    path: path.to_path_buf(),
    source,
  };

  let reader = ImageReader::open(path)
    .map_err(io_err)?
    .with_guessed_format()
    .map_err(io_err)?;
  let format = reader.format();
  let image = reader
    .decode()
    .map_err(|source| ImageFileInputError::ImageDecodeError {
      path: path.to_path_buf(),
      source,
    })?;

  debug!(
    "读取图像 {}: {}x{} {:?}",
    path.display(),
    image.width(),
    image.height(),
    format
  );

  Ok(ImageFile::new(path, image.into_rgb8()).with_format(format))
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn lists_files_sorted_and_skips_directories() {
    let dir = tempfile::tempdir().unwrap();
    RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
      .save(dir.path().join("b.png"))
      .unwrap();
    RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
      .save(dir.path().join("a.png"))
      .unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();

    let input = ImageDirectoryInput::open(dir.path()).unwrap();
    assert_eq!(input.len(), 2);

    let names: Vec<_> = input
      .into_iter()
      .map(|r| r.unwrap().display_name())
      .collect();
    assert_eq!(names, vec!["a.png", "b.png"]);
  }

  #[test]
  fn undecodable_file_yields_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

    let mut iter = ImageDirectoryInput::open(dir.path()).unwrap().into_iter();
    match iter.next() {
      Some(Err(ImageFileInputError::ImageDecodeError { path, .. })) => {
        assert!(path.ends_with("broken.png"))
      }
      other => panic!("unexpected: {other:?}"),
    }
    assert!(iter.next().is_none());
  }

  #[test]
  fn format_is_detected_from_content() {
    let dir = tempfile::tempdir().unwrap();
    RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
      .save_with_format(dir.path().join("IMG_0001"), image::ImageFormat::Png)
      .unwrap();

    let frame = ImageDirectoryInput::open(dir.path())
      .unwrap()
      .into_iter()
      .next()
      .unwrap()
      .unwrap();
    assert_eq!(frame.format, Some(image::ImageFormat::Png));
    assert_eq!(frame.display_name(), "IMG_0001");
  }

  #[test]
  fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(
      ImageDirectoryInput::open(&missing),
      Err(ImageFileInputError::DirectoryError { .. })
    ));
  }
}
