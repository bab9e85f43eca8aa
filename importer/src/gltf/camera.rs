//! Camera conversion.

use crate::math::RAD_TO_DEG;
use crate::scene::{CameraDescriptor, Projection};

use super::document;
use super::error::ImportError;
use super::options::Hooks;

pub(crate) fn build_camera(
    index: usize,
    camera: &document::Camera,
    hooks: &Hooks<document::Camera, CameraDescriptor>,
) -> Result<CameraDescriptor, ImportError> {
    hooks.run(camera, || match camera.camera_type.as_str() {
        "orthographic" => {
            let ortho = camera.orthographic.as_ref().ok_or_else(|| missing(index, "orthographic"))?;
            Ok(CameraDescriptor {
                projection: Projection::Orthographic,
                fov_degrees: 0.0,
                ortho_height: 0.5 * ortho.ymag,
                aspect_ratio: (ortho.ymag != 0.0).then(|| ortho.xmag / ortho.ymag),
                near: ortho.znear,
                far: ortho.zfar,
            })
        }
        "perspective" => {
            let persp = camera.perspective.as_ref().ok_or_else(|| missing(index, "perspective"))?;
            Ok(CameraDescriptor {
                projection: Projection::Perspective,
                fov_degrees: persp.yfov * RAD_TO_DEG,
                ortho_height: 0.0,
                aspect_ratio: persp.aspect_ratio,
                near: persp.znear,
                far: persp.zfar,
            })
        }
        other => Err(ImportError::Format(format!(
            "camera {index} has unknown type '{other}'"
        ))),
    })
}

fn missing(index: usize, block: &str) -> ImportError {
    ImportError::Format(format!("camera {index} is {block} but has no {block} block"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(json: &str) -> Result<CameraDescriptor, ImportError> {
        build_camera(0, &serde_json::from_str(json).unwrap(), &Hooks::default())
    }

    #[test]
    fn perspective() {
        let c = camera(r#"{"type":"perspective","perspective":{"yfov":1.0,"znear":0.1}}"#).unwrap();
        assert_eq!(c.projection, Projection::Perspective);
        assert!((c.fov_degrees - 57.29578).abs() < 1e-3);
        assert_eq!((c.aspect_ratio, c.near, c.far), (None, 0.1, None));
    }

    #[test]
    fn orthographic() {
        let c = camera(
            r#"{"type":"orthographic","orthographic":{"xmag":4.0,"ymag":2.0,"znear":0.5,"zfar":50.0}}"#,
        )
        .unwrap();
        assert_eq!(c.projection, Projection::Orthographic);
        assert_eq!(c.ortho_height, 1.0);
        assert_eq!(c.aspect_ratio, Some(2.0));
        assert_eq!(c.far, Some(50.0));
    }

    #[test]
    fn missing_block_or_type_fails() {
        assert!(camera(r#"{"type":"perspective"}"#).is_err());
        assert!(camera(r#"{"type":"fisheye"}"#).is_err());
    }
}
