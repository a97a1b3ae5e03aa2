//! Camera producing the view matrix consumed by the renderer.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};

/// A free-look camera described by position, yaw and pitch.
///
/// The renderer only consumes [`view_matrix`](Self::view_matrix); how the
/// host application moves the camera between frames is up to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    /// The world-to-view transform for the current position and orientation.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Matrix4::look_to_rh(
            self.position,
            Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize(),
            Vector3::unit_y(),
        )
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, EuclideanSpace, Transform};

    use super::*;

    #[test]
    fn view_matrix_maps_camera_position_to_origin() {
        let camera = Camera::new((3.0, 5.0, -2.0), Deg(-90.0), Deg(-20.0));
        let eye = camera
            .view_matrix()
            .transform_point(Point3::new(3.0, 5.0, -2.0));
        assert!(eye.to_vec().magnitude() < 1e-5);
    }

    #[test]
    fn yaw_minus_ninety_looks_down_negative_z() {
        let camera = Camera::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(0.0));
        // a point ahead of the camera ends up in front (negative view z)
        let ahead = camera
            .view_matrix()
            .transform_point(Point3::new(0.0, 0.0, -10.0));
        assert!(ahead.z < 0.0);
    }
}
