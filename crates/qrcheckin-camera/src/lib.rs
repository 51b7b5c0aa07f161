//! Webcam access for qrcheckin.
//!
//! With the `native` feature this crate opens cameras through `nokhwa`
//! (V4L2 on Linux, AVFoundation on macOS, Media Foundation on Windows).
//! Without it every open fails with [`CameraError::Unsupported`], which the
//! scanner reports the same way as a missing device.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use image::RgbImage;
use thiserror::Error;

/// Errors produced by camera access.
#[derive(Debug, Error)]
pub enum CameraError {
    /// The device could not be opened or its stream could not be started.
    #[error("could not open camera {index}: {message}")]
    Open {
        /// Device index that was requested.
        index: u32,
        /// Backend message.
        message: String,
    },

    /// A frame could not be read from an open device.
    #[error("failed to capture frame: {0}")]
    Frame(String),

    /// Device enumeration failed.
    #[error("failed to list cameras: {0}")]
    Query(String),

    /// The crate was built without a camera backend.
    #[error("camera support not compiled in (enable the `native` feature)")]
    Unsupported,
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// A camera visible to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Backend index used to open the device.
    pub index: String,
    /// Human readable device name.
    pub name: String,
    /// Backend description (driver, bus).
    pub description: String,
}

/// Requested capture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Device index.
    pub index: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
    /// Preferred frame rate.
    pub fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Name of the compiled-in backend.
#[must_use]
pub fn backend_name() -> &'static str {
    if cfg!(feature = "native") {
        "nokhwa"
    } else {
        "none"
    }
}

#[cfg(feature = "native")]
mod native {
    use image::RgbImage;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    };
    use nokhwa::Camera;
    use tracing::{debug, warn};

    use super::{CameraError, CaptureSettings, DeviceInfo, Result};

    pub(super) struct NativeCamera {
        camera: Camera,
        index: u32,
    }

    impl NativeCamera {
        pub(super) fn open(settings: CaptureSettings) -> Result<Self> {
            let open_err = |e: nokhwa::NokhwaError| CameraError::Open {
                index: settings.index,
                message: e.to_string(),
            };

            let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                CameraFormat::new_from(
                    settings.width,
                    settings.height,
                    FrameFormat::MJPEG,
                    settings.fps,
                ),
            ));
            let mut camera =
                Camera::new(CameraIndex::Index(settings.index), requested).map_err(open_err)?;
            camera.open_stream().map_err(open_err)?;

            debug!(
                index = settings.index,
                name = %camera.info().human_name(),
                format = ?camera.camera_format(),
                "Camera stream opened"
            );
            Ok(Self {
                camera,
                index: settings.index,
            })
        }

        pub(super) fn name(&self) -> String {
            self.camera.info().human_name()
        }

        pub(super) fn frame(&mut self) -> Result<RgbImage> {
            let buffer = self
                .camera
                .frame()
                .map_err(|e| CameraError::Frame(e.to_string()))?;
            let decoded = buffer
                .decode_image::<RgbFormat>()
                .map_err(|e| CameraError::Frame(e.to_string()))?;
            // Rebuild from raw bytes so our `image` version need not match nokhwa's
            let (width, height) = (decoded.width(), decoded.height());
            RgbImage::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
                CameraError::Frame(format!("short frame buffer for {width}x{height}"))
            })
        }
    }

    impl Drop for NativeCamera {
        fn drop(&mut self) {
            if let Err(e) = self.camera.stop_stream() {
                warn!(index = self.index, error = %e, "Failed to stop camera stream");
            }
        }
    }

    pub(super) fn list_devices() -> Result<Vec<DeviceInfo>> {
        let devices =
            nokhwa::query(ApiBackend::Auto).map_err(|e| CameraError::Query(e.to_string()))?;
        Ok(devices
            .into_iter()
            .map(|info| DeviceInfo {
                index: info.index().as_string(),
                name: info.human_name(),
                description: info.description().to_string(),
            })
            .collect())
    }
}

/// An open webcam stream.
///
/// The stream is stopped when the value is dropped.
pub struct Webcam {
    #[cfg(feature = "native")]
    inner: native::NativeCamera,
    settings: CaptureSettings,
}

impl std::fmt::Debug for Webcam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webcam")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Webcam {
    /// Open the camera described by `settings` and start streaming.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::Open`] if the device is missing or busy, and
    /// [`CameraError::Unsupported`] when no backend is compiled in.
    #[cfg(feature = "native")]
    pub fn open(settings: CaptureSettings) -> Result<Self> {
        Ok(Self {
            inner: native::NativeCamera::open(settings)?,
            settings,
        })
    }

    /// Open the camera described by `settings` and start streaming.
    ///
    /// # Errors
    ///
    /// Always returns [`CameraError::Unsupported`] in this build.
    #[cfg(not(feature = "native"))]
    pub fn open(settings: CaptureSettings) -> Result<Self> {
        tracing::debug!(index = settings.index, "No camera backend compiled in");
        Err(CameraError::Unsupported)
    }

    /// Settings the stream was opened with.
    #[must_use]
    pub fn settings(&self) -> CaptureSettings {
        self.settings
    }

    /// Human readable device name.
    #[must_use]
    pub fn name(&self) -> String {
        #[cfg(feature = "native")]
        {
            self.inner.name()
        }
        #[cfg(not(feature = "native"))]
        {
            format!("camera {}", self.settings.index)
        }
    }

    /// Block until the next frame is available and return it as RGB.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::Frame`] if the device stops delivering frames.
    pub fn frame(&mut self) -> Result<RgbImage> {
        #[cfg(feature = "native")]
        {
            self.inner.frame()
        }
        #[cfg(not(feature = "native"))]
        {
            Err(CameraError::Unsupported)
        }
    }
}

/// List the cameras the backend can see.
///
/// # Errors
///
/// Returns an error if enumeration fails or no backend is compiled in.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    #[cfg(feature = "native")]
    {
        native::list_devices()
    }
    #[cfg(not(feature = "native"))]
    {
        Err(CameraError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CaptureSettings::default();
        assert_eq!(settings.index, 0);
        assert_eq!(settings.width, 640);
        assert_eq!(settings.height, 480);
        assert_eq!(settings.fps, 30);
    }

    #[test]
    fn test_open_error_display() {
        let err = CameraError::Open {
            index: 2,
            message: "device busy".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("camera 2"));
        assert!(msg.contains("device busy"));
    }

    #[cfg(not(feature = "native"))]
    #[test]
    fn test_open_without_backend_is_unsupported() {
        let result = Webcam::open(CaptureSettings::default());
        assert!(matches!(result, Err(CameraError::Unsupported)));
        assert!(matches!(list_devices(), Err(CameraError::Unsupported)));
        assert_eq!(backend_name(), "none");
    }
}
