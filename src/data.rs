//! IDX-format dataset loading
//!
//! Parses the MNIST IDX file format: a big-endian header (magic number,
//! item count, and for images the row/col extents) followed by raw `u8`
//! payload. Pixels are normalized to `[0, 1]` and emitted as one
//! `(1, 1, rows, cols)` tensor per image; labels become one-hot
//! `(1, 1, 1, 10)` tensors. Malformed headers and truncated payloads
//! surface as [`CnnError::InvalidData`] naming the offending file.

use crate::error::CnnError;
use crate::tensor::Tensor;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;

/// Number of classes for one-hot label encoding.
pub const NUM_CLASSES: usize = 10;

fn read_be_u32<R: Read>(reader: &mut R) -> Result<u32, CnnError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn invalid(path: &Path, message: String) -> CnnError {
    CnnError::InvalidData {
        path: path.display().to_string(),
        message,
    }
}

/// Loads IDX images as normalized `(1, 1, rows, cols)` tensors.
///
/// `limit` truncates the dataset after that many images; `None` loads
/// everything the header declares.
pub fn load_idx_images<P: AsRef<Path>>(
    path: P,
    limit: Option<usize>,
) -> Result<Vec<Tensor>, CnnError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);

    let magic = read_be_u32(&mut reader)?;
    if magic != IMAGE_MAGIC {
        return Err(invalid(
            path,
            format!("bad image magic number {}, expected {}", magic, IMAGE_MAGIC),
        ));
    }
    let count = read_be_u32(&mut reader)? as usize;
    let rows = read_be_u32(&mut reader)? as usize;
    let cols = read_be_u32(&mut reader)? as usize;
    if rows == 0 || cols == 0 {
        return Err(invalid(
            path,
            format!("degenerate image extent {}x{}", rows, cols),
        ));
    }

    let take = limit.map_or(count, |l| l.min(count));
    let mut images = Vec::with_capacity(take);
    let mut pixels = vec![0u8; rows * cols];
    for i in 0..take {
        reader.read_exact(&mut pixels).map_err(|_| {
            invalid(
                path,
                format!("truncated payload: failed reading image {} of {}", i, take),
            )
        })?;
        let data = pixels.iter().map(|&p| p as f32 / 255.0).collect();
        images.push(Tensor::from_vec(1, 1, rows, cols, data)?);
    }
    log::info!("loaded {} images ({}x{}) from {}", take, rows, cols, path.display());
    Ok(images)
}

/// Loads IDX labels as one-hot `(1, 1, 1, 10)` tensors.
pub fn load_idx_labels<P: AsRef<Path>>(
    path: P,
    limit: Option<usize>,
) -> Result<Vec<Tensor>, CnnError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);

    let magic = read_be_u32(&mut reader)?;
    if magic != LABEL_MAGIC {
        return Err(invalid(
            path,
            format!("bad label magic number {}, expected {}", magic, LABEL_MAGIC),
        ));
    }
    let count = read_be_u32(&mut reader)? as usize;

    let take = limit.map_or(count, |l| l.min(count));
    let mut raw = vec![0u8; take];
    reader
        .read_exact(&mut raw)
        .map_err(|_| invalid(path, format!("truncated payload: expected {} labels", take)))?;

    let mut labels = Vec::with_capacity(take);
    for (i, &label) in raw.iter().enumerate() {
        if label as usize >= NUM_CLASSES {
            return Err(invalid(
                path,
                format!("label {} at index {} is out of range 0..{}", label, i, NUM_CLASSES),
            ));
        }
        labels.push(one_hot(label as usize));
    }
    log::info!("loaded {} labels from {}", take, path.display());
    Ok(labels)
}

/// One-hot encode a class index into a `(1, 1, 1, 10)` tensor.
pub fn one_hot(class: usize) -> Tensor {
    let mut t = Tensor::new(1, 1, 1, NUM_CLASSES);
    t.set(0, 0, 0, class, 1.0);
    t
}
