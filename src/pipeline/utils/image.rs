use anyhow::Error;
use opencv::core::{Mat, Vector, CV_8U};
use opencv::imgcodecs::{imdecode, IMREAD_COLOR, IMREAD_IGNORE_ORIENTATION};
use opencv::imgproc::{cvt_color_def, equalize_hist, COLOR_BGR2GRAY, COLOR_BGRA2GRAY};
use opencv::prelude::*;

/// Decodes an encoded image (JPEG, PNG, ...) into a 3-channel BGR `Mat`.
/// Pixels stay in stored order, an EXIF orientation tag is not applied.
pub fn byte_data_to_opencv(im_bytes: &[u8]) -> Result<Mat, Error> {
    if im_bytes.is_empty() {
        return Err(Error::msg("cannot identify image file: no image data"))
    }

    let buffer = Vector::<u8>::from_slice(im_bytes);
    let opencv_img = imdecode(&buffer, IMREAD_COLOR | IMREAD_IGNORE_ORIENTATION)?;

    // imdecode reports unknown formats with an empty matrix rather than an error
    if is_empty(&opencv_img) {
        return Err(Error::msg(format!(
            "cannot identify image file: {} bytes could not be decoded",
            im_bytes.len()
        )))
    }

    Ok(opencv_img)
}

pub fn is_empty(img: &Mat) -> bool {
    img.rows() <= 0 || img.cols() <= 0
}

/// An image the pipeline can work on: non-empty with 8-bit samples.
pub fn is_valid_image(img: &Mat) -> bool {
    !is_empty(img) && img.depth() == CV_8U
}

/// Returns a single-channel view of the image, or `None` for channel
/// layouts the pipeline does not understand.
pub fn to_grayscale(img: &Mat) -> Result<Option<Mat>, Error> {
    let code = match img.channels() {
        1 => return Ok(Some(img.try_clone()?)),
        3 => COLOR_BGR2GRAY,
        4 => COLOR_BGRA2GRAY,
        _ => return Ok(None),
    };

    let mut gray = Mat::default();
    cvt_color_def(img, &mut gray, code)?;
    Ok(Some(gray))
}

pub fn equalize(gray: &Mat) -> Result<Mat, Error> {
    let mut equalized = Mat::default();
    equalize_hist(gray, &mut equalized)?;
    Ok(equalized)
}

#[cfg(test)]
mod tests {
    use opencv::core::{Scalar, Vector, CV_32FC1, CV_8UC1, CV_8UC2, CV_8UC3};
    use opencv::imgcodecs::imencode;
    use super::*;

    fn encode_png(img: &Mat) -> Vec<u8> {
        let mut buf = Vector::<u8>::new();
        imencode(".png", img, &mut buf, &Vector::new()).unwrap();
        buf.to_vec()
    }

    /// JPEG with an APP1 segment carrying Orientation=6 (rotate 90° clockwise).
    fn encode_rotated_jpeg(img: &Mat) -> Vec<u8> {
        let mut buf = Vector::<u8>::new();
        imencode(".jpg", img, &mut buf, &Vector::new()).unwrap();
        let jpeg = buf.to_vec();

        let mut app1: Vec<u8> = vec![0xFF, 0xE1, 0x00, 0x22];
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(&[b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
        app1.extend_from_slice(&[0x00, 0x01]);
        app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x06, 0x00, 0x00]);
        app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&app1);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_byte_data_to_opencv() {
        let img = Mat::new_rows_cols_with_default(32, 48, CV_8UC3, Scalar::new(10.0, 20.0, 30.0, 0.0)).unwrap();
        let decoded = byte_data_to_opencv(&encode_png(&img)).unwrap();

        assert_eq!(decoded.rows(), 32);
        assert_eq!(decoded.cols(), 48);
        assert_eq!(decoded.channels(), 3);
    }

    #[test]
    fn test_byte_data_to_opencv_ignores_exif_orientation() {
        let img = Mat::new_rows_cols_with_default(40, 80, CV_8UC3, Scalar::all(128.0)).unwrap();
        let jpeg = encode_rotated_jpeg(&img);

        // the tag is honoured by a plain color decode
        let rotated = imdecode(&Vector::<u8>::from_slice(&jpeg), IMREAD_COLOR).unwrap();
        assert_eq!((rotated.rows(), rotated.cols()), (80, 40));

        let decoded = byte_data_to_opencv(&jpeg).unwrap();
        assert_eq!((decoded.rows(), decoded.cols()), (40, 80));
        assert_eq!(decoded.channels(), 3);
    }

    #[test]
    fn test_byte_data_to_opencv_expands_grayscale() {
        let img = Mat::new_rows_cols_with_default(16, 16, CV_8UC1, Scalar::all(200.0)).unwrap();
        let decoded = byte_data_to_opencv(&encode_png(&img)).unwrap();

        assert_eq!(decoded.channels(), 3);
    }

    #[test]
    fn test_byte_data_to_opencv_rejects_garbage() {
        let err = byte_data_to_opencv(b"definitely not an image").unwrap_err();
        assert!(err.to_string().contains("cannot identify image file"));

        let err = byte_data_to_opencv(&[]).unwrap_err();
        assert!(err.to_string().contains("no image data"));
    }

    #[test]
    fn test_is_valid_image() {
        assert!(!is_valid_image(&Mat::default()));

        let float_img = Mat::new_rows_cols_with_default(4, 4, CV_32FC1, Scalar::all(0.5)).unwrap();
        assert!(!is_valid_image(&float_img));

        let img = Mat::new_rows_cols_with_default(4, 4, CV_8UC3, Scalar::all(0.0)).unwrap();
        assert!(is_valid_image(&img));
    }

    #[test]
    fn test_to_grayscale() {
        let color = Mat::new_rows_cols_with_default(8, 8, CV_8UC3, Scalar::all(90.0)).unwrap();
        let gray = to_grayscale(&color).unwrap().unwrap();
        assert_eq!(gray.channels(), 1);
        assert_eq!(*gray.at_2d::<u8>(0, 0).unwrap(), 90);

        let single = Mat::new_rows_cols_with_default(8, 8, CV_8UC1, Scalar::all(7.0)).unwrap();
        let gray = to_grayscale(&single).unwrap().unwrap();
        assert_eq!(*gray.at_2d::<u8>(3, 3).unwrap(), 7);

        let two_channel = Mat::new_rows_cols_with_default(8, 8, CV_8UC2, Scalar::all(7.0)).unwrap();
        assert!(to_grayscale(&two_channel).unwrap().is_none());
    }
}
